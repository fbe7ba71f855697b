//! Failure injection for the producer and consumer paths.

use std::sync::Arc;
use std::time::Duration;

use pubsub_trace::pubsub::{
    DaprTransport, Order, PublishError, Publisher, TransportError,
};
use pubsub_trace::trace::{InMemoryExporter, SpanStatus, Tracer};

mod common;

fn publisher(
    config: pubsub_trace::config::PubSubConfig,
) -> (Publisher<DaprTransport>, InMemoryExporter) {
    let exporter = InMemoryExporter::default();
    let tracer = Tracer::new("publisher", Arc::new(exporter.clone()));
    (
        Publisher::new(DaprTransport::new(&config).unwrap(), tracer, config),
        exporter,
    )
}

#[tokio::test]
async fn test_sidecar_error_status_fails_publish() {
    let (addr, sidecar) = common::start_mock_sidecar().await;
    sidecar.respond_with(500);
    let (publisher, exporter) = publisher(common::pubsub_config(addr));

    let err = publisher
        .publish_order(Order::new("c", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PublishError::Transport(TransportError::Status { status: 500, .. })
    ));

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    match &spans[0].status {
        SpanStatus::Error { cause } => assert!(cause.contains("500")),
        other => panic!("expected error status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_sidecar_times_out() {
    let (addr, sidecar) = common::start_mock_sidecar().await;
    sidecar.delay(Duration::from_millis(500));
    let mut config = common::pubsub_config(addr);
    config.publish_timeout_ms = 50;
    let (publisher, exporter) = publisher(config);

    let err = publisher
        .publish_order(Order::new("c", 1.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PublishError::Transport(TransportError::Timeout(50))
    ));
    assert_eq!(
        exporter.finished_spans()[0].status,
        SpanStatus::error("publish timed out after 50 ms")
    );
}

#[tokio::test]
async fn test_unreachable_sidecar() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (publisher, exporter) = publisher(common::pubsub_config(addr));
    let err = publisher
        .publish_order(Order::new("c", 1.0))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Transport(TransportError::Http(_))));
    assert_eq!(exporter.finished_spans()[0].status.as_str(), "error");
}

#[tokio::test]
async fn test_cancelled_publish_still_ends_span() {
    let (addr, sidecar) = common::start_mock_sidecar().await;
    sidecar.delay(Duration::from_secs(2));
    let (publisher, exporter) = publisher(common::pubsub_config(addr));

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        publisher.publish_order(Order::new("c", 1.0)),
    )
    .await;
    assert!(result.is_err(), "publish should have been cancelled");

    let spans = exporter.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, SpanStatus::error("span dropped before finish"));
}
