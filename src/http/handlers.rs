//! Request handlers for the producer and delivery endpoints.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::pubsub::{CloudEvent, DeliveryOutcome, Order, PublishError, Transport};

/// Delivery status understood by the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryStatus {
    Success,
    Retry,
    Drop,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize)]
pub struct PublishParams {
    #[serde(default = "default_customer")]
    pub customer: String,
    #[serde(default = "default_amount")]
    pub amount: f64,
}

fn default_customer() -> String {
    "test-customer".to_string()
}

fn default_amount() -> f64 {
    100.00
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Subscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

/// `GET /publish`: publish one order under a new trace.
pub async fn publish_order<T: Transport>(
    State(state): State<AppState<T>>,
    Query(params): Query<PublishParams>,
) -> impl IntoResponse {
    let order = Order::new(params.customer, params.amount);

    match state.publisher.publish_order(order).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(PublishError::InvalidOrder(e)) => {
            (StatusCode::BAD_REQUEST, format!("Invalid order: {}", e)).into_response()
        }
        Err(PublishError::Transport(e)) => {
            tracing::error!(error = %e, "Publish failed");
            (StatusCode::BAD_GATEWAY, "Failed to publish order").into_response()
        }
    }
}

/// Delivery endpoint for the orders topic.
///
/// Trace-context problems never fail the delivery. Processing failures are
/// reported back as `RETRY` or `DROP`; redelivery is the sidecar's job.
pub async fn receive_order<T: Transport>(
    State(state): State<AppState<T>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<CloudEvent<Order>>(&body) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(error = %e, "Delivery body is not an order CloudEvent");
                None
            }
        }
    };

    match state.subscriber.handle_delivery(event, &headers).await {
        Ok(DeliveryOutcome::Processed { .. }) | Ok(DeliveryOutcome::Skipped { .. }) => (
            StatusCode::OK,
            Json(DeliveryResponse {
                status: DeliveryStatus::Success,
            }),
        ),
        Err(e) if e.is_retryable() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DeliveryResponse {
                status: DeliveryStatus::Retry,
            }),
        ),
        Err(_) => (
            StatusCode::OK,
            Json(DeliveryResponse {
                status: DeliveryStatus::Drop,
            }),
        ),
    }
}

/// `GET /dapr/subscribe`: programmatic subscription list.
pub async fn subscriptions<T: Transport>(
    State(state): State<AppState<T>>,
) -> Json<Vec<Subscription>> {
    Json(vec![Subscription {
        pubsubname: state.pubsub.pubsub_name.clone(),
        topic: state.pubsub.topic.clone(),
        route: state.pubsub.route.clone(),
    }])
}

pub async fn health() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}
