//! Consumer path: recover the trace context from a delivery and process the
//! order under a consumer span.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::config::schema::ProcessingConfig;
use crate::observability::metrics;
use crate::pubsub::envelope::{CloudEvent, Order, OrderError};
use crate::trace::propagation::{parse, resolve, Extractor, Traceparent};
use crate::trace::span::{self, SpanKind, SpanStatus};
use crate::trace::{TraceId, Tracer};

/// Failure while handling a delivered order.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("invalid order {order_id}: {source}")]
    InvalidOrder {
        order_id: Uuid,
        #[source]
        source: OrderError,
    },

    #[error("processing timed out after {0} ms")]
    Timeout(u64),
}

impl ProcessingError {
    /// Whether redelivering the same message could succeed. The transport
    /// decides what to do with this; the subscriber never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessingError::Timeout(_))
    }
}

/// What happened to an acknowledged delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Processed { order_id: Uuid, trace_id: TraceId },
    /// Empty or undecodable payload; acknowledged without processing.
    Skipped { trace_id: TraceId },
}

/// Decode the trace context of a delivery.
///
/// Headers are consulted first (`traceparent`, then the legacy
/// `cloudevent.traceid`); the CloudEvent `traceparent` attribute is used
/// only when the headers carry neither.
pub fn extract_context<E: Extractor + ?Sized>(
    headers: &E,
    event: Option<&CloudEvent<Order>>,
) -> Traceparent {
    match resolve(headers) {
        Traceparent::Absent => parse(event.and_then(|e| e.traceparent.as_deref())),
        decoded => decoded,
    }
}

/// Handles deliveries for the orders topic.
#[derive(Debug, Clone)]
pub struct Subscriber {
    tracer: Tracer,
    config: ProcessingConfig,
}

impl Subscriber {
    pub fn new(tracer: Tracer, config: ProcessingConfig) -> Self {
        Self { tracer, config }
    }

    /// Handle one delivery.
    ///
    /// A missing or malformed `traceparent` is logged and never fails the
    /// delivery. Only processing failures are returned.
    pub async fn handle_delivery<E: Extractor + Sync + ?Sized>(
        &self,
        event: Option<CloudEvent<Order>>,
        headers: &E,
    ) -> Result<DeliveryOutcome, ProcessingError> {
        span::scope(self.handle_in_scope(event, headers)).await
    }

    async fn handle_in_scope<E: Extractor + Sync + ?Sized>(
        &self,
        event: Option<CloudEvent<Order>>,
        headers: &E,
    ) -> Result<DeliveryOutcome, ProcessingError> {
        let decoded = extract_context(headers, event.as_ref());
        match &decoded {
            Traceparent::Present(ctx) => tracing::info!(
                trace_id = %ctx.trace_id(),
                span_id = %ctx.span_id(),
                sampled = ctx.is_sampled(),
                "Received traceparent"
            ),
            Traceparent::Absent => tracing::warn!("No traceparent header received"),
            Traceparent::Malformed { raw, reason } => tracing::warn!(
                traceparent = %raw,
                reason = %reason,
                "Malformed traceparent, continuing without trace context"
            ),
        }

        let label = decoded.label();
        let mut span = match decoded.into_context() {
            Some(parent) => self
                .tracer
                .start_child(&parent, SpanKind::Consumer, "receive-order"),
            None => self.tracer.start_root(SpanKind::Consumer, "receive-order"),
        };
        let trace_id = span.context().trace_id();

        let order = match event.and_then(|e| e.data) {
            Some(order) => order,
            None => {
                tracing::warn!(trace_id = %trace_id, "Received empty or invalid order data");
                span.finish(SpanStatus::Ok);
                metrics::record_delivery(label, "skipped");
                return Ok(DeliveryOutcome::Skipped { trace_id });
            }
        };
        span.set_attribute("order.id", order.order_id.to_string());

        if let Err(source) = order.validate() {
            let err = ProcessingError::InvalidOrder {
                order_id: order.order_id,
                source,
            };
            tracing::error!(trace_id = %trace_id, error = %err, "Error processing order");
            span.finish(SpanStatus::error(err.to_string()));
            metrics::record_delivery(label, "invalid");
            return Err(err);
        }

        let limit = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(limit, self.process(&order, trace_id)).await {
            Ok(()) => {
                span.finish(SpanStatus::Ok);
                metrics::record_delivery(label, "processed");
                Ok(DeliveryOutcome::Processed {
                    order_id: order.order_id,
                    trace_id,
                })
            }
            Err(_) => {
                let err = ProcessingError::Timeout(self.config.timeout_ms);
                tracing::error!(trace_id = %trace_id, order_id = %order.order_id, error = %err, "Error processing order");
                span.finish(SpanStatus::error(err.to_string()));
                metrics::record_delivery(label, "timeout");
                Err(err)
            }
        }
    }

    async fn process(&self, order: &Order, trace_id: TraceId) {
        tracing::info!(
            trace_id = %trace_id,
            order_id = %order.order_id,
            customer = %order.customer,
            amount = order.amount,
            "Processing order"
        );

        tokio::time::sleep(Duration::from_millis(self.config.simulated_latency_ms)).await;

        tracing::info!(trace_id = %trace_id, order_id = %order.order_id, "Successfully processed order");
    }
}
