//! Producer path: mint a trace context, attach it, publish.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::schema::PubSubConfig;
use crate::observability::metrics;
use crate::pubsub::envelope::{Metadata, Order, OrderError};
use crate::pubsub::transport::{Transport, TransportError};
use crate::trace::propagation::legacy::{self, LegacyAttributes};
use crate::trace::propagation::{attach, build};
use crate::trace::span::{self, SpanKind, SpanStatus};
use crate::trace::{SpanId, TraceId, Tracer};

/// CloudEvent type written with the legacy keys.
pub const ORDER_EVENT_TYPE: &str = "com.dapr.event.sent";

/// Errors returned to the caller of [`Publisher::publish_order`].
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("transport publish failed: {0}")]
    Transport(#[from] TransportError),
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    pub order_id: Uuid,
    pub topic: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub traceparent: String,
}

/// Publishes orders with a freshly originated trace context.
#[derive(Debug)]
pub struct Publisher<T> {
    transport: T,
    tracer: Tracer,
    config: PubSubConfig,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T, tracer: Tracer, config: PubSubConfig) -> Self {
        Self {
            transport,
            tracer,
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Publish `order` under a new root trace.
    ///
    /// The producer span ends `Ok` on acknowledgement and `Error` on any
    /// failure, including cancellation of the returned future.
    pub async fn publish_order(&self, order: Order) -> Result<PublishReceipt, PublishError> {
        span::scope(self.publish_in_scope(order)).await
    }

    async fn publish_in_scope(&self, order: Order) -> Result<PublishReceipt, PublishError> {
        let started = Instant::now();
        let topic = self.config.topic.as_str();

        let context = self.tracer.root_context();
        tracing::info!(
            trace_id = %context.trace_id(),
            span_id = %context.span_id(),
            "Generated trace context"
        );

        let span = self
            .tracer
            .span_builder(context, None, SpanKind::Producer, "publish-event")
            .with_attribute("messaging.destination", topic)
            .with_attribute("messaging.pubsub", self.config.pubsub_name.as_str())
            .with_attribute("order.id", order.order_id.to_string())
            .start();

        if let Err(e) = order.validate() {
            tracing::warn!(order_id = %order.order_id, error = %e, "Refusing to publish invalid order");
            span.finish(SpanStatus::error(e.to_string()));
            metrics::record_publish("invalid", started);
            return Err(e.into());
        }

        let mut metadata = Metadata::new();
        attach(&mut metadata, span.context(), &self.config.traceparent_key);
        if self.config.emit_legacy_keys {
            legacy::attach_legacy(
                &mut metadata,
                span.context(),
                &LegacyAttributes {
                    source: self.tracer.service_name().to_string(),
                    event_type: ORDER_EVENT_TYPE.to_string(),
                    id: order.order_id.to_string(),
                },
            );
        }

        let traceparent = build(span.context());
        tracing::info!(
            order_id = %order.order_id,
            topic = %topic,
            traceparent = %traceparent,
            "Publishing order"
        );

        match self.transport.publish(topic, &order, &metadata).await {
            Ok(ack) => {
                let receipt = PublishReceipt {
                    order_id: order.order_id,
                    topic: ack.topic,
                    trace_id: span.context().trace_id(),
                    span_id: span.context().span_id(),
                    traceparent,
                };
                span.finish(SpanStatus::Ok);
                metrics::record_publish("success", started);
                tracing::info!(
                    order_id = %receipt.order_id,
                    trace_id = %receipt.trace_id,
                    "Published order"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(order_id = %order.order_id, error = %e, "Error publishing event");
                span.finish(SpanStatus::error(e.to_string()));
                metrics::record_publish("failure", started);
                Err(e.into())
            }
        }
    }
}
