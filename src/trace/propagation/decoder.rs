//! `traceparent` decoding.
//!
//! Decoding is total: every input maps to [`Traceparent::Present`],
//! [`Traceparent::Absent`] or [`Traceparent::Malformed`].

use thiserror::Error;

use crate::trace::context::{TraceContext, TraceFlags};
use crate::trace::ids::{IdError, SpanId, TraceId};
use crate::trace::propagation::{legacy, Extractor, SUPPORTED_VERSION, TRACEPARENT_KEY};

/// Reason a `traceparent` value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTraceparent {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),

    #[error("unsupported version {0:?}")]
    Version(String),

    #[error("invalid trace id: {0}")]
    TraceId(IdError),

    #[error("invalid span id: {0}")]
    SpanId(IdError),

    #[error("invalid flags {0:?}")]
    Flags(String),
}

/// Outcome of decoding a `traceparent` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traceparent {
    Present(TraceContext),
    Absent,
    Malformed {
        raw: String,
        reason: MalformedTraceparent,
    },
}

impl Traceparent {
    /// The decoded context, if any.
    pub fn context(&self) -> Option<&TraceContext> {
        match self {
            Traceparent::Present(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn into_context(self) -> Option<TraceContext> {
        match self {
            Traceparent::Present(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Short label used for log fields and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Traceparent::Present(_) => "present",
            Traceparent::Absent => "absent",
            Traceparent::Malformed { .. } => "malformed",
        }
    }
}

/// Decode a `traceparent` value.
pub fn parse(value: Option<&str>) -> Traceparent {
    let raw = match value.map(str::trim) {
        None | Some("") => return Traceparent::Absent,
        Some(raw) => raw,
    };

    match decode_fields(raw) {
        Ok(ctx) => Traceparent::Present(ctx),
        Err(reason) => Traceparent::Malformed {
            raw: raw.to_string(),
            reason,
        },
    }
}

fn decode_fields(raw: &str) -> Result<TraceContext, MalformedTraceparent> {
    let fields: Vec<&str> = raw.split('-').collect();
    if fields.len() != 4 {
        return Err(MalformedTraceparent::FieldCount(fields.len()));
    }

    if fields[0] != SUPPORTED_VERSION {
        return Err(MalformedTraceparent::Version(fields[0].to_string()));
    }

    let trace_id: TraceId = fields[1].parse().map_err(MalformedTraceparent::TraceId)?;
    let span_id: SpanId = fields[2].parse().map_err(MalformedTraceparent::SpanId)?;

    let flags = fields[3];
    if flags.len() != 2 || !flags.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(MalformedTraceparent::Flags(flags.to_string()));
    }
    let flags = u8::from_str_radix(flags, 16)
        .map_err(|_| MalformedTraceparent::Flags(flags.to_string()))?;

    Ok(TraceContext::new(trace_id, span_id, TraceFlags::new(flags)))
}

/// Decode the context carried by `carrier`.
///
/// `traceparent` is authoritative whenever the key is present, even if its
/// value is malformed. Only a carrier without it falls back to the legacy
/// `cloudevent.traceid` key.
pub fn resolve<E: Extractor + ?Sized>(carrier: &E) -> Traceparent {
    match carrier.get_lossy(TRACEPARENT_KEY) {
        Some(value) => parse(Some(&*value)),
        None => legacy::extract(carrier),
    }
}
