//! Span lifecycle and the task-scoped "current span" binding.
//!
//! # States
//! ```text
//! Created (SpanBuilder) → Started (Span) → Ended(Ok | Error) (SpanData)
//! ```
//!
//! # Design Decisions
//! - `finish` consumes the span, so it can run at most once
//! - Dropping a started span ends it as `Error`; early returns, `?`,
//!   panics and task cancellation all release it
//! - The current-span binding lives in a tokio task-local, never a global;
//!   spans push onto a per-task stack and remove themselves when they end,
//!   so the binding falls back to the newest span still open

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::observability::metrics;
use crate::trace::context::TraceContext;
use crate::trace::export::SpanExporter;
use crate::trace::ids::SpanId;

tokio::task_local! {
    static CURRENT_SPAN: RefCell<Vec<TraceContext>>;
}

/// Run `fut` with its own current-span slot.
///
/// Nested calls reuse the enclosing slot so inner operations can see the
/// outer span.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    if CURRENT_SPAN.try_with(|_| ()).is_ok() {
        fut.await
    } else {
        CURRENT_SPAN.scope(RefCell::new(Vec::new()), fut).await
    }
}

/// Context of the span currently bound to this task, if any.
pub fn current_context() -> Option<TraceContext> {
    CURRENT_SPAN
        .try_with(|open| open.borrow().last().cloned())
        .ok()
        .flatten()
}

/// Bind `context` as current. No-op outside a scope.
fn push_current(context: &TraceContext) {
    let _ = CURRENT_SPAN.try_with(|open| open.borrow_mut().push(context.clone()));
}

/// Unbind `context` wherever it sits, leaving the other open spans in order.
fn remove_current(context: &TraceContext) {
    let _ = CURRENT_SPAN.try_with(|open| {
        let mut open = open.borrow_mut();
        if let Some(pos) = open.iter().rposition(|c| c.span_id() == context.span_id()) {
            open.remove(pos);
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
        }
    }
}

/// Terminal status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "code", rename_all = "lowercase")]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error { cause: String },
}

impl SpanStatus {
    pub fn error(cause: impl Into<String>) -> Self {
        SpanStatus::Error {
            cause: cause.into(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Unset => "unset",
            SpanStatus::Ok => "ok",
            SpanStatus::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanState {
    Created,
    Started,
    Ended(SpanStatus),
}

/// Recorded span, as handed to a [`SpanExporter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanData {
    pub name: String,
    pub kind: SpanKind,
    pub context: TraceContext,
    pub parent_span_id: Option<SpanId>,
    pub status: SpanStatus,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
    pub attributes: Vec<(String, String)>,
}

impl SpanData {
    pub fn state(&self) -> SpanState {
        match self.end_time {
            Some(_) => SpanState::Ended(self.status.clone()),
            None => SpanState::Started,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end_time
            .and_then(|end| end.duration_since(self.start_time).ok())
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A span that has not been started yet.
#[derive(Debug)]
pub struct SpanBuilder {
    name: String,
    kind: SpanKind,
    context: TraceContext,
    parent_span_id: Option<SpanId>,
    attributes: Vec<(String, String)>,
    exporter: Arc<dyn SpanExporter>,
}

impl SpanBuilder {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: SpanKind,
        context: TraceContext,
        parent_span_id: Option<SpanId>,
        exporter: Arc<dyn SpanExporter>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            context,
            parent_span_id,
            attributes: Vec::new(),
            exporter,
        }
    }

    pub fn state(&self) -> SpanState {
        SpanState::Created
    }

    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Start the span and bind it as the task's current span.
    pub fn start(self) -> Span {
        push_current(&self.context);

        tracing::debug!(
            span_name = %self.name,
            kind = self.kind.as_str(),
            trace_id = %self.context.trace_id(),
            span_id = %self.context.span_id(),
            "Span started"
        );

        Span {
            data: SpanData {
                name: self.name,
                kind: self.kind,
                context: self.context,
                parent_span_id: self.parent_span_id,
                status: SpanStatus::Unset,
                start_time: SystemTime::now(),
                end_time: None,
                attributes: self.attributes,
            },
            exporter: self.exporter,
            ended: false,
        }
    }
}

/// A started span. Owned by the operation that started it.
#[derive(Debug)]
pub struct Span {
    data: SpanData,
    exporter: Arc<dyn SpanExporter>,
    ended: bool,
}

impl Span {
    pub fn context(&self) -> &TraceContext {
        &self.data.context
    }

    pub fn state(&self) -> SpanState {
        SpanState::Started
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.attributes.push((key.into(), value.into()));
    }

    /// Record the terminal status, release the binding and export.
    pub fn finish(mut self, status: SpanStatus) -> SpanData {
        self.end(status)
    }

    fn end(&mut self, status: SpanStatus) -> SpanData {
        self.ended = true;
        self.data.status = status;
        self.data.end_time = Some(SystemTime::now());
        remove_current(&self.data.context);

        metrics::record_span_finished(self.data.kind.as_str(), self.data.status.as_str());

        let data = self.data.clone();
        self.exporter.export(data.clone());
        data
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.ended {
            tracing::warn!(
                span_name = %self.data.name,
                trace_id = %self.data.context.trace_id(),
                span_id = %self.data.context.span_id(),
                "Span dropped before finish"
            );
            self.end(SpanStatus::error("span dropped before finish"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::export::InMemoryExporter;
    use crate::trace::tracer::Tracer;

    fn tracer() -> (Tracer, InMemoryExporter) {
        let exporter = InMemoryExporter::default();
        (Tracer::new("test", Arc::new(exporter.clone())), exporter)
    }

    #[tokio::test]
    async fn test_finish_ok() {
        let (tracer, exporter) = tracer();
        let span = tracer.start_root(SpanKind::Producer, "publish-event");
        let data = span.finish(SpanStatus::Ok);

        assert_eq!(data.state(), SpanState::Ended(SpanStatus::Ok));
        assert!(data.end_time.unwrap() >= data.start_time);
        assert_eq!(exporter.finished_spans(), vec![data]);
    }

    #[tokio::test]
    async fn test_finish_error_keeps_cause() {
        let (tracer, exporter) = tracer();
        let span = tracer.start_root(SpanKind::Consumer, "receive-order");
        span.finish(SpanStatus::error("broker unavailable"));

        let spans = exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].status,
            SpanStatus::Error {
                cause: "broker unavailable".into()
            }
        );
    }

    #[tokio::test]
    async fn test_binding_restored_after_finish() {
        let (tracer, _exporter) = tracer();
        scope(async {
            let outer = tracer.start_root(SpanKind::Consumer, "outer");
            let before = current_context();
            assert_eq!(before.as_ref(), Some(outer.context()));

            let inner = tracer.start_child(outer.context(), SpanKind::Producer, "inner");
            assert_eq!(current_context().as_ref(), Some(inner.context()));
            inner.finish(SpanStatus::Ok);

            assert_eq!(current_context(), before);
            outer.finish(SpanStatus::Ok);
            assert_eq!(current_context(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_out_of_order_finish_keeps_open_span_current() {
        let (tracer, _exporter) = tracer();
        scope(async {
            let outer = tracer.start_root(SpanKind::Consumer, "outer");
            let inner = tracer.start_child(outer.context(), SpanKind::Producer, "inner");
            let inner_ctx = inner.context().clone();

            outer.finish(SpanStatus::Ok);
            assert_eq!(current_context(), Some(inner_ctx));

            inner.finish(SpanStatus::Ok);
            assert_eq!(current_context(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_no_binding_outside_scope() {
        let (tracer, _exporter) = tracer();
        let span = tracer.start_root(SpanKind::Producer, "unscoped");
        assert_eq!(current_context(), None);
        span.finish(SpanStatus::Ok);
    }

    #[tokio::test]
    async fn test_drop_ends_span_as_error() {
        let (tracer, exporter) = tracer();
        scope(async {
            let _span = tracer.start_root(SpanKind::Producer, "early-return");
        })
        .await;

        let spans = exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status.as_str(), "error");
    }

    #[tokio::test]
    async fn test_cancelled_task_ends_span() {
        let (tracer, exporter) = tracer();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        let task_tracer = tracer.clone();
        let handle = tokio::spawn(scope(async move {
            let _span = task_tracer.start_root(SpanKind::Consumer, "slow");
            let _ = started_tx.send(());
            tokio::time::sleep(Duration::from_secs(60)).await;
        }));

        started_rx.await.unwrap();
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        let spans = exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].status,
            SpanStatus::error("span dropped before finish")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scopes_do_not_leak() {
        let (tracer, _exporter) = tracer();

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let tracer = tracer.clone();
                tokio::spawn(scope(async move {
                    let span = tracer.start_root(SpanKind::Producer, "concurrent");
                    let own = span.context().clone();
                    for _ in 0..5 {
                        tokio::task::yield_now().await;
                        assert_eq!(current_context().as_ref(), Some(&own));
                    }
                    span.finish(SpanStatus::Ok);
                    current_context()
                }))
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), None);
        }
    }
}
