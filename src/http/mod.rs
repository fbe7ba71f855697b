//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! GET  /publish          → handlers.rs → pubsub::Publisher → sidecar
//! POST /orders (route)   → handlers.rs → pubsub::Subscriber
//! GET  /dapr/subscribe   → subscription list for the sidecar
//! GET  /health           → liveness
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
