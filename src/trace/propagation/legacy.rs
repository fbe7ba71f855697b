//! Discrete `cloudevent.*` metadata keys.
//!
//! Older publishers set CloudEvent attributes one key at a time instead of a
//! single `traceparent`. `cloudevent.traceid` holds a full `traceparent`
//! value. These keys are accepted on the consumer side and only written when
//! explicitly enabled.

use crate::trace::context::TraceContext;
use crate::trace::propagation::decoder::{parse, Traceparent};
use crate::trace::propagation::{build, Extractor, Injector};

pub const TRACE_ID_KEY: &str = "cloudevent.traceid";
pub const SOURCE_KEY: &str = "cloudevent.source";
pub const TYPE_KEY: &str = "cloudevent.type";
pub const ID_KEY: &str = "cloudevent.id";

/// CloudEvent attributes written alongside the trace id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyAttributes {
    pub source: String,
    pub event_type: String,
    pub id: String,
}

/// Write the discrete `cloudevent.*` keys.
pub fn attach_legacy<I: Injector + ?Sized>(
    carrier: &mut I,
    context: &TraceContext,
    attributes: &LegacyAttributes,
) {
    carrier.set(TRACE_ID_KEY, build(context));
    carrier.set(SOURCE_KEY, attributes.source.clone());
    carrier.set(TYPE_KEY, attributes.event_type.clone());
    carrier.set(ID_KEY, attributes.id.clone());
}

/// Decode `cloudevent.traceid`.
pub fn extract<E: Extractor + ?Sized>(carrier: &E) -> Traceparent {
    parse(carrier.get_lossy(TRACE_ID_KEY).as_deref())
}
