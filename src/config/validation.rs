//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the sidecar URL and metadata key are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("pubsub.sidecar_url: {0}")]
    SidecarUrl(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("pubsub.route must start with '/'")]
    Route,

    #[error("processing.simulated_latency_ms ({latency}) must be below processing.timeout_ms ({timeout})")]
    LatencyExceedsTimeout { latency: u64, timeout: u64 },
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.request_timeout_secs"));
    }

    let pubsub = &config.pubsub;
    match url::Url::parse(&pubsub.sidecar_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::SidecarUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::SidecarUrl(e.to_string())),
    }
    for (field, value) in [
        ("pubsub.pubsub_name", &pubsub.pubsub_name),
        ("pubsub.topic", &pubsub.topic),
        ("pubsub.traceparent_key", &pubsub.traceparent_key),
        ("tracing.service_name", &config.tracing.service_name),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty(field));
        }
    }
    if !pubsub.route.starts_with('/') {
        errors.push(ValidationError::Route);
    }
    if pubsub.publish_timeout_ms == 0 {
        errors.push(ValidationError::Zero("pubsub.publish_timeout_ms"));
    }

    let processing = &config.processing;
    if processing.timeout_ms == 0 {
        errors.push(ValidationError::Zero("processing.timeout_ms"));
    } else if processing.simulated_latency_ms >= processing.timeout_ms {
        errors.push(ValidationError::LatencyExceedsTimeout {
            latency: processing.simulated_latency_ms,
            timeout: processing.timeout_ms,
        });
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
