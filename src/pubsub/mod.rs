//! Pub/sub messaging subsystem.
//!
//! # Data Flow
//! ```text
//! Producer:
//!     Order → producer.rs (root context, Producer span)
//!     → envelope.rs Metadata (traceparent attached)
//!     → transport.rs (sidecar publish, timeout-bounded)
//!
//! Consumer:
//!     delivery (CloudEvent + headers)
//!     → consumer.rs (decode context, Consumer span)
//!     → validate + process order
//!     → outcome / ProcessingError back to the delivery boundary
//! ```
//!
//! # Design Decisions
//! - Payloads are strongly typed `Order` records validated at the boundary
//! - Trace decode problems never fail a delivery
//! - Retry and redelivery belong to the transport, not to this crate

pub mod consumer;
pub mod envelope;
pub mod producer;
pub mod transport;

pub use consumer::{DeliveryOutcome, ProcessingError, Subscriber};
pub use envelope::{CloudEvent, Metadata, Order, OutgoingMessage};
pub use producer::{PublishError, PublishReceipt, Publisher};
pub use transport::{Ack, DaprTransport, InMemoryTransport, Transport, TransportError};
