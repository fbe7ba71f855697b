//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (metrics, tracer, transport)
//! - Bind the listener last, so traffic only arrives when ready
//!
//! Any startup error is fatal.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::observability::metrics;
use crate::pubsub::{DaprTransport, Publisher, Subscriber, TransportError};
use crate::trace::{LoggingExporter, Tracer};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("metrics setup failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Build every component from `config`.
pub fn build_server(config: &ServiceConfig) -> Result<HttpServer, StartupError> {
    let tracer = Tracer::from_config(&config.tracing, Arc::new(LoggingExporter));
    let transport = DaprTransport::new(&config.pubsub)?;

    let publisher = Publisher::new(transport, tracer.clone(), config.pubsub.clone());
    let subscriber = Subscriber::new(tracer, config.processing.clone());

    Ok(HttpServer::new(
        &config.listener,
        config.pubsub.clone(),
        publisher,
        subscriber,
    ))
}

/// Start the service and serve until `shutdown` fires.
pub async fn run(config: ServiceConfig, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let server = build_server(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        sidecar = %config.pubsub.sidecar_url,
        pubsub = %config.pubsub.pubsub_name,
        topic = %config.pubsub.topic,
        "Listening for connections"
    );

    server.run(listener, shutdown).await?;
    Ok(())
}
