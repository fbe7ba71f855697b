//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ListenerConfig, PubSubConfig};
use crate::http::handlers;
use crate::lifecycle::signals::shutdown_signal;
use crate::pubsub::{Publisher, Subscriber, Transport};

/// Application state injected into handlers.
pub struct AppState<T> {
    pub publisher: Arc<Publisher<T>>,
    pub subscriber: Arc<Subscriber>,
    pub pubsub: Arc<PubSubConfig>,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
            subscriber: self.subscriber.clone(),
            pubsub: self.pubsub.clone(),
        }
    }
}

/// HTTP server hosting the producer and delivery endpoints.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<T: Transport>(
        listener: &ListenerConfig,
        pubsub: PubSubConfig,
        publisher: Publisher<T>,
        subscriber: Subscriber,
    ) -> Self {
        let state = AppState {
            publisher: Arc::new(publisher),
            subscriber: Arc::new(subscriber),
            pubsub: Arc::new(pubsub),
        };
        let router = build_router(state, Duration::from_secs(listener.request_timeout_secs));
        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until a shutdown is triggered or Ctrl+C is received.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<T: Transport>(state: AppState<T>, request_timeout: Duration) -> Router {
    let route = state.pubsub.route.clone();

    Router::new()
        .route("/publish", get(handlers::publish_order::<T>))
        .route(&route, post(handlers::receive_order::<T>))
        .route("/dapr/subscribe", get(handlers::subscriptions::<T>))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::http::handlers::{DeliveryResponse, DeliveryStatus, Subscription};
    use crate::pubsub::{CloudEvent, InMemoryTransport, Order};
    use crate::trace::{InMemoryExporter, SpanKind, Tracer};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        transport: InMemoryTransport,
        exporter: InMemoryExporter,
    }

    fn harness() -> Harness {
        let exporter = InMemoryExporter::default();
        let tracer = Tracer::new("pubsub-trace", Arc::new(exporter.clone()));
        let transport = InMemoryTransport::new();
        let pubsub = PubSubConfig::default();
        let server = HttpServer::new(
            &ListenerConfig::default(),
            pubsub.clone(),
            Publisher::new(transport.clone(), tracer.clone(), pubsub),
            Subscriber::new(
                tracer,
                ProcessingConfig {
                    simulated_latency_ms: 1,
                    timeout_ms: 1_000,
                },
            ),
        );
        Harness {
            router: server.router(),
            transport,
            exporter,
        }
    }

    fn order_event(order: Order) -> String {
        serde_json::to_string(&CloudEvent::new("publisher", "com.dapr.event.sent", order)).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_publish_endpoint() {
        let h = harness();
        let response = h
            .router
            .oneshot(
                Request::get("/publish?customer=acme&amount=12.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let receipt: serde_json::Value = body_json(response).await;

        let published = h.transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message.payload.customer, "acme");
        assert_eq!(
            published[0].message.metadata.get("traceparent"),
            receipt["traceparent"].as_str()
        );
    }

    #[tokio::test]
    async fn test_publish_failure_is_bad_gateway() {
        let h = harness();
        h.transport.fail_with("down");
        let response = h
            .router
            .oneshot(Request::get("/publish").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(h.exporter.finished_spans()[0].status.as_str(), "error");
    }

    #[tokio::test]
    async fn test_delivery_with_traceparent_header() {
        let h = harness();
        let response = h
            .router
            .oneshot(
                Request::post("/orders")
                    .header("content-type", "application/cloudevents+json")
                    .header(
                        "traceparent",
                        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                    )
                    .body(Body::from(order_event(Order::new("acme", 3.0))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: DeliveryResponse = body_json(response).await;
        assert_eq!(body.status, DeliveryStatus::Success);

        let spans = h.exporter.finished_spans();
        assert_eq!(spans[0].kind, SpanKind::Consumer);
        assert_eq!(
            spans[0].context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }

    #[tokio::test]
    async fn test_delivery_parses_sidecar_cloud_event() {
        let h = harness();
        let body = r#"{
            "id": "evt-7",
            "source": "publisher",
            "type": "com.dapr.event.sent",
            "data": {
                "orderId": "0f8fad5b-d9cb-469f-a165-70867728950e",
                "customer": "acme",
                "amount": 9.5,
                "timestamp": 1700000000000
            }
        }"#;
        let response = h
            .router
            .oneshot(
                Request::post("/orders")
                    .header("content-type", "application/cloudevents+json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let spans = h.exporter.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].attribute("order.id"),
            Some("0f8fad5b-d9cb-469f-a165-70867728950e")
        );
    }

    #[tokio::test]
    async fn test_unreadable_traceparent_does_not_fall_back_to_legacy_key() {
        let h = harness();
        let response = h
            .router
            .oneshot(
                Request::post("/orders")
                    .header(
                        "traceparent",
                        axum::http::HeaderValue::from_bytes(b"00-\xff\xfe-garbage").unwrap(),
                    )
                    .header(
                        "cloudevent.traceid",
                        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                    )
                    .body(Body::from(order_event(Order::new("acme", 3.0))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let spans = h.exporter.finished_spans();
        assert_eq!(spans[0].parent_span_id, None);
        assert_ne!(
            spans[0].context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }

    #[tokio::test]
    async fn test_delivery_malformed_and_empty_bodies_succeed() {
        let h = harness();
        for (traceparent, body) in [("garbage", "not json"), ("", "")] {
            let response = h
                .router
                .clone()
                .oneshot(
                    Request::post("/orders")
                        .header("traceparent", traceparent)
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(h.exporter.finished_spans().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_order_is_dropped() {
        let h = harness();
        let response = h
            .router
            .oneshot(
                Request::post("/orders")
                    .body(Body::from(order_event(Order::new("acme", -1.0))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: DeliveryResponse = body_json(response).await;
        assert_eq!(body.status, DeliveryStatus::Drop);
    }

    #[tokio::test]
    async fn test_subscription_list() {
        let h = harness();
        let response = h
            .router
            .oneshot(Request::get("/dapr/subscribe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let subscriptions: Vec<Subscription> = body_json(response).await;
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].pubsubname, "pulsar-pubsub");
        assert_eq!(subscriptions[0].topic, "orders");
        assert_eq!(subscriptions[0].route, "/orders");
    }
}
