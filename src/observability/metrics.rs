//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pubsub_publish_total` (counter): publishes by outcome
//! - `pubsub_publish_duration_seconds` (histogram): publish latency
//! - `pubsub_deliveries_total` (counter): deliveries by trace context and outcome
//! - `pubsub_spans_finished_total` (counter): finished spans by kind and status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_publish(outcome: &'static str, started: Instant) {
    ::metrics::counter!("pubsub_publish_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("pubsub_publish_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

/// `context` is the decode outcome: present, absent or malformed.
pub fn record_delivery(context: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "pubsub_deliveries_total",
        "context" => context,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_span_finished(kind: &'static str, status: &'static str) {
    ::metrics::counter!("pubsub_spans_finished_total", "kind" => kind, "status" => status)
        .increment(1);
}
