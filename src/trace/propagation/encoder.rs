//! `traceparent` encoding.

use crate::trace::context::TraceContext;
use crate::trace::propagation::{Injector, SUPPORTED_VERSION};

/// Serialize a context as `00-{trace_id}-{span_id}-{flags}`.
pub fn build(context: &TraceContext) -> String {
    format!(
        "{}-{}-{}-{}",
        SUPPORTED_VERSION,
        context.trace_id(),
        context.span_id(),
        context.flags()
    )
}

/// Write the encoded context under `key`. No other key is touched.
pub fn attach<I: Injector + ?Sized>(carrier: &mut I, context: &TraceContext, key: &str) {
    carrier.set(key, build(context));
}
