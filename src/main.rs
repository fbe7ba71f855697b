//! Order publisher/subscriber with W3C trace-context propagation.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                    pubsub-trace                       │
//!                  │                                                       │
//!   GET /publish   │  ┌─────────┐   ┌───────────┐   ┌──────────────────┐  │
//!   ───────────────┼─▶│  http   │──▶│ Publisher │──▶│ trace: root ctx, │  │
//!                  │  │ handler │   │ (producer)│   │ Producer span,   │──┼──▶ sidecar
//!                  │  └─────────┘   └───────────┘   │ traceparent      │  │   publish
//!                  │                                 └──────────────────┘  │
//!                  │                                                       │
//!   POST /orders   │  ┌─────────┐   ┌────────────┐  ┌──────────────────┐  │
//!   ◀──────────────┼──│  http   │◀──│ Subscriber │◀─│ trace: decode,   │  │
//!   (delivery)     │  │ handler │   │ (consumer) │  │ Consumer span    │  │
//!                  │  └─────────┘   └────────────┘  └──────────────────┘  │
//!                  │                                                       │
//!                  │  config · observability · lifecycle                   │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use pubsub_trace::config::{load_config, ServiceConfig};
use pubsub_trace::lifecycle::{startup, Shutdown};
use pubsub_trace::observability::logging;

#[derive(Parser)]
#[command(name = "pubsub-trace")]
#[command(about = "Order publisher/subscriber with trace-context propagation", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("pubsub-trace v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        service_name = %config.tracing.service_name,
        sampled = config.tracing.sampled,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    startup::run(config, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
