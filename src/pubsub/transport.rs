//! Pub/sub transport clients.
//!
//! # Responsibilities
//! - Publish a payload plus metadata to a topic
//! - Bound every publish with a timeout
//! - Report failures as `TransportError`, never retry
//!
//! # Design Decisions
//! - `Transport` is a trait so the producer is independent of the broker
//! - The sidecar client forwards metadata as `metadata.<key>` query
//!   parameters, and the `traceparent` key as a header as well

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::PubSubConfig;
use crate::pubsub::envelope::{Metadata, Order, OutgoingMessage};
use crate::trace::propagation::TRACEPARENT_KEY;

/// Errors returned by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid sidecar URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sidecar returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("publish timed out after {0} ms")]
    Timeout(u64),

    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Broker acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub topic: String,
    pub message_id: Option<String>,
}

/// Client side of the broker.
pub trait Transport: Send + Sync + 'static {
    fn publish(
        &self,
        topic: &str,
        payload: &Order,
        metadata: &Metadata,
    ) -> impl Future<Output = Result<Ack, TransportError>> + Send;
}

/// Publishes through the sidecar HTTP API:
/// `POST {sidecar}/v1.0/publish/{pubsub}/{topic}?metadata.{key}={value}`.
#[derive(Debug, Clone)]
pub struct DaprTransport {
    client: reqwest::Client,
    base_url: Url,
    pubsub_name: String,
    timeout_ms: u64,
}

impl DaprTransport {
    pub fn new(config: &PubSubConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.sidecar_url)
            .map_err(|e| TransportError::InvalidUrl(format!("'{}': {}", config.sidecar_url, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            pubsub_name: config.pubsub_name.clone(),
            timeout_ms: config.publish_timeout_ms,
        })
    }

    fn publish_url(&self, topic: &str, metadata: &Metadata) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1.0", "publish", self.pubsub_name.as_str(), topic]);

        if !metadata.is_empty() {
            let mut pairs: Vec<_> = metadata.iter().collect();
            pairs.sort();
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(&format!("metadata.{}", key), value);
            }
        }
        Ok(url)
    }
}

impl Transport for DaprTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: &Order,
        metadata: &Metadata,
    ) -> Result<Ack, TransportError> {
        let url = self.publish_url(topic, metadata)?;
        let mut request = self.client.post(url).json(payload);
        if let Some(traceparent) = metadata.get(TRACEPARENT_KEY) {
            request = request.header(TRACEPARENT_KEY, traceparent);
        }

        // Bounds the error body read as well as the send.
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok::<(), TransportError>(())
        };
        tokio::time::timeout(Duration::from_millis(self.timeout_ms), exchange)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout_ms))??;

        Ok(Ack {
            topic: topic.to_string(),
            message_id: None,
        })
    }
}

/// A message captured by [`InMemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub message: OutgoingMessage,
}

/// Records published messages in memory. Can be switched to reject
/// publishes to exercise failure paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    reject_with: Arc<Mutex<Option<String>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following publish with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self
            .reject_with
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(reason.into());
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Transport for InMemoryTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: &Order,
        metadata: &Metadata,
    ) -> Result<Ack, TransportError> {
        let rejection = self
            .reject_with
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(reason) = rejection {
            return Err(TransportError::Rejected(reason));
        }

        let mut published = self
            .published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        published.push(PublishedMessage {
            topic: topic.to_string(),
            message: OutgoingMessage::new(payload.clone(), metadata.clone()),
        });

        Ok(Ack {
            topic: topic.to_string(),
            message_id: Some(published.len().to_string()),
        })
    }
}
