//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tokio::net::TcpListener;

use pubsub_trace::config::PubSubConfig;

/// One request received by the mock sidecar.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct CapturedPublish {
    pub pubsub: String,
    pub topic: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

/// Programmable stand-in for the sidecar publish API.
#[derive(Clone, Default)]
pub struct MockSidecar {
    captured: Arc<Mutex<Vec<CapturedPublish>>>,
    status: Arc<AtomicU16>,
    delay_ms: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl MockSidecar {
    pub fn captured(&self) -> Vec<CapturedPublish> {
        self.captured.lock().unwrap().clone()
    }

    pub fn respond_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

async fn publish(
    State(sidecar): State<MockSidecar>,
    Path((pubsub, topic)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let delay = sidecar.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let headers = headers
        .iter()
        .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
        .collect();
    sidecar.captured.lock().unwrap().push(CapturedPublish {
        pubsub,
        topic,
        query,
        headers,
        body,
    });

    StatusCode::from_u16(sidecar.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::NO_CONTENT)
}

/// Start a mock sidecar on an ephemeral port.
pub async fn start_mock_sidecar() -> (SocketAddr, MockSidecar) {
    let sidecar = MockSidecar::default();
    sidecar.respond_with(204);

    let app = Router::new()
        .route("/v1.0/publish/{pubsub}/{topic}", post(publish))
        .with_state(sidecar.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, sidecar)
}

/// Pub/sub config pointing at `sidecar`.
pub fn pubsub_config(sidecar: SocketAddr) -> PubSubConfig {
    PubSubConfig {
        sidecar_url: format!("http://{}", sidecar),
        publish_timeout_ms: 2_000,
        ..PubSubConfig::default()
    }
}
