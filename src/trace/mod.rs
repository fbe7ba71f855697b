//! Trace-context core.
//!
//! # Data Flow
//! ```text
//! Producer:
//!     ids.rs (fresh trace/span id)
//!     → tracer.rs (root context, Producer span)
//!     → propagation/encoder.rs (traceparent into metadata)
//!     → span.rs (finish → export.rs)
//!
//! Consumer:
//!     propagation/decoder.rs (Present | Absent | Malformed)
//!     → tracer.rs (child context, or fresh root)
//!     → span.rs (Consumer span, finish → export.rs)
//! ```
//!
//! # Design Decisions
//! - The `Tracer` is constructed once and passed around; there is no
//!   process-wide registry
//! - The current span is task-scoped (`span::scope`), never shared between
//!   concurrently running operations

pub mod context;
pub mod export;
pub mod ids;
pub mod propagation;
pub mod span;
pub mod tracer;

pub use context::{TraceContext, TraceFlags};
pub use export::{InMemoryExporter, LoggingExporter, SpanExporter};
pub use ids::{generate_span_id, generate_trace_id, IdGenerator, RandomIdGenerator, SpanId, TraceId};
pub use propagation::{Traceparent, TRACEPARENT_KEY};
pub use span::{current_context, scope, Span, SpanData, SpanKind, SpanStatus};
pub use tracer::Tracer;
