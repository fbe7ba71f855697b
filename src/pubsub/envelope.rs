//! Message envelope types.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::trace::propagation::{Extractor, Injector};

/// String key/value metadata travelling next to a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(HashMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Injector for Metadata {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key, value);
    }
}

impl Extractor for Metadata {
    fn get(&self, key: &str) -> Option<&str> {
        Metadata::get(self, key)
    }
}

/// Rejected order fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("customer must not be empty")]
    MissingCustomer,

    #[error("amount must be a finite, non-negative number")]
    InvalidAmount,
}

/// An order document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: Uuid,
    pub customer: String,
    pub amount: f64,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Order {
    pub fn new(customer: impl Into<String>, amount: f64) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            order_id: Uuid::new_v4(),
            customer: customer.into(),
            amount,
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.customer.trim().is_empty() {
            return Err(OrderError::MissingCustomer);
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(OrderError::InvalidAmount);
        }
        Ok(())
    }
}

/// A payload with its metadata, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub payload: Order,
    pub metadata: Metadata,
}

impl OutgoingMessage {
    pub fn new(payload: Order, metadata: Metadata) -> Self {
        Self { payload, metadata }
    }
}

fn default_spec_version() -> String {
    "1.0".to_string()
}

/// CloudEvents 1.0 envelope as delivered by the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent<T> {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub source: String,

    #[serde(rename = "type", default)]
    pub event_type: String,

    #[serde(default = "default_spec_version")]
    pub specversion: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubsubname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> CloudEvent<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            specversion: default_spec_version(),
            datacontenttype: Some("application/json".to_string()),
            topic: None,
            pubsubname: None,
            traceparent: None,
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_json_is_camel_case() {
        let order = Order::new("test-customer", 100.0);
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("orderId").is_some());
        assert_eq!(json["customer"], "test-customer");
        assert_eq!(json["amount"], 100.0);
        assert!(json["timestamp"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_order_validation() {
        assert!(Order::new("c", 0.0).validate().is_ok());
        assert_eq!(Order::new(" ", 1.0).validate(), Err(OrderError::MissingCustomer));
        assert_eq!(Order::new("c", -1.0).validate(), Err(OrderError::InvalidAmount));
        assert_eq!(Order::new("c", f64::NAN).validate(), Err(OrderError::InvalidAmount));
    }

    #[test]
    fn test_cloud_event_from_sidecar_json() {
        let event: CloudEvent<Order> = serde_json::from_str(
            r#"{
                "id": "5929aaac-a5e2-4ca1-859c-edfe73f11565",
                "source": "publisher",
                "type": "com.dapr.event.sent",
                "specversion": "1.0",
                "datacontenttype": "application/json",
                "topic": "orders",
                "pubsubname": "pulsar-pubsub",
                "traceparent": "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                "data": {
                    "orderId": "0f8fad5b-d9cb-469f-a165-70867728950e",
                    "customer": "test-customer",
                    "amount": 100.0,
                    "timestamp": 1700000000000
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.topic.as_deref(), Some("orders"));
        assert_eq!(event.data.unwrap().customer, "test-customer");
    }

    #[test]
    fn test_cloud_event_without_data() {
        let event: CloudEvent<Order> = serde_json::from_str(r#"{"id": "1"}"#).unwrap();
        assert!(event.data.is_none());
        assert_eq!(event.specversion, "1.0");
    }
}
