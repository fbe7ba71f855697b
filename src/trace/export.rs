//! Hand-off of finished spans to an exporter.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::trace::span::SpanData;

/// Receives every finished span. Wire format and transport are up to the
/// implementation.
pub trait SpanExporter: Send + Sync + fmt::Debug {
    fn export(&self, span: SpanData);
}

/// Emits each finished span as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LoggingExporter;

impl SpanExporter for LoggingExporter {
    fn export(&self, span: SpanData) {
        let parent_span_id = span.parent_span_id.map(|id| id.to_string());
        let duration_ms = span.duration().map(|d| d.as_secs_f64() * 1000.0);
        tracing::info!(
            target: "pubsub_trace::spans",
            span_name = %span.name,
            kind = span.kind.as_str(),
            trace_id = %span.context.trace_id(),
            span_id = %span.context.span_id(),
            parent_span_id = ?parent_span_id,
            sampled = span.context.is_sampled(),
            status = span.status.as_str(),
            duration_ms = ?duration_ms,
            "Span finished"
        );
    }
}

/// Collects finished spans in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemoryExporter {
    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn reset(&self) {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: SpanData) {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(span);
    }
}
