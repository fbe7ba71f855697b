//! Explicitly constructed tracer shared by the producer and consumer paths.

use std::sync::Arc;

use crate::config::schema::TracingConfig;
use crate::trace::context::{TraceContext, TraceFlags};
use crate::trace::export::SpanExporter;
use crate::trace::ids::{IdGenerator, RandomIdGenerator};
use crate::trace::span::{Span, SpanBuilder, SpanKind};

/// Creates contexts and spans. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Tracer {
    service_name: Arc<str>,
    generator: Arc<dyn IdGenerator>,
    exporter: Arc<dyn SpanExporter>,
    flags: TraceFlags,
}

impl Tracer {
    /// Create a sampling tracer with random identifiers.
    pub fn new(service_name: impl Into<String>, exporter: Arc<dyn SpanExporter>) -> Self {
        Self {
            service_name: Arc::from(service_name.into()),
            generator: Arc::new(RandomIdGenerator::default()),
            exporter,
            flags: TraceFlags::SAMPLED,
        }
    }

    pub fn from_config(config: &TracingConfig, exporter: Arc<dyn SpanExporter>) -> Self {
        Self::new(config.service_name.clone(), exporter).with_sampled(config.sampled)
    }

    pub fn with_id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Sampling decision applied to new root contexts.
    pub fn with_sampled(mut self, sampled: bool) -> Self {
        self.flags = if sampled {
            TraceFlags::SAMPLED
        } else {
            TraceFlags::NOT_SAMPLED
        };
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Originate a new trace: fresh trace id and span id.
    pub fn root_context(&self) -> TraceContext {
        TraceContext::new(
            self.generator.new_trace_id(),
            self.generator.new_span_id(),
            self.flags,
        )
    }

    /// Continue `parent`: inherited trace id, flags and trace state, fresh
    /// span id.
    pub fn child_context(&self, parent: &TraceContext) -> TraceContext {
        let child = TraceContext::new(
            parent.trace_id(),
            self.generator.new_span_id(),
            parent.flags(),
        );
        match parent.trace_state() {
            Some(state) => child.with_trace_state(state),
            None => child,
        }
    }

    /// Prepare a span whose own identity is `context`.
    pub fn span_builder(
        &self,
        context: TraceContext,
        parent: Option<&TraceContext>,
        kind: SpanKind,
        name: impl Into<String>,
    ) -> SpanBuilder {
        SpanBuilder::new(
            name,
            kind,
            context,
            parent.map(TraceContext::span_id),
            self.exporter.clone(),
        )
        .with_attribute("service.name", &*self.service_name)
    }

    pub fn start(&self, context: TraceContext, kind: SpanKind, name: impl Into<String>) -> Span {
        self.span_builder(context, None, kind, name).start()
    }

    /// Start a span in a brand new trace.
    pub fn start_root(&self, kind: SpanKind, name: impl Into<String>) -> Span {
        self.start(self.root_context(), kind, name)
    }

    /// Start a span continuing a remote parent.
    pub fn start_child(
        &self,
        parent: &TraceContext,
        kind: SpanKind,
        name: impl Into<String>,
    ) -> Span {
        let context = self.child_context(parent);
        self.span_builder(context, Some(parent), kind, name).start()
    }
}
