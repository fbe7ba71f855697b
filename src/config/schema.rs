//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the publisher/subscriber service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Pub/sub sidecar and topic settings.
    pub pubsub: PubSubConfig,

    /// Span and trace-context settings.
    pub tracing: TracingConfig,

    /// Consumer-side order processing.
    pub processing: ProcessingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Pub/sub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PubSubConfig {
    /// Base URL of the pub/sub sidecar HTTP API.
    pub sidecar_url: String,

    /// Name of the pub/sub component.
    pub pubsub_name: String,

    /// Topic orders are published to and consumed from.
    pub topic: String,

    /// Route the sidecar delivers messages to.
    pub route: String,

    /// Metadata key the encoded `traceparent` is written under.
    pub traceparent_key: String,

    /// Also write the discrete `cloudevent.*` keys.
    pub emit_legacy_keys: bool,

    /// Publish timeout in milliseconds.
    pub publish_timeout_ms: u64,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            sidecar_url: "http://localhost:3500".to_string(),
            pubsub_name: "pulsar-pubsub".to_string(),
            topic: "orders".to_string(),
            route: "/orders".to_string(),
            traceparent_key: "traceparent".to_string(),
            emit_legacy_keys: false,
            publish_timeout_ms: 5_000,
        }
    }
}

/// Trace-context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Service name recorded on every span.
    pub service_name: String,

    /// Sampled flag for traces this service originates.
    pub sampled: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "pubsub-trace".to_string(),
            sampled: true,
        }
    }
}

/// Consumer-side processing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Simulated downstream latency per order in milliseconds.
    pub simulated_latency_ms: u64,

    /// Upper bound on processing one delivery in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 100,
            timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
