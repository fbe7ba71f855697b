//! W3C trace-context propagation across a pub/sub boundary.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pubsub;
pub mod trace;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
