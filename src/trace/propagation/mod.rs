//! `traceparent` propagation over string key/value carriers.
//!
//! # Data Flow
//! ```text
//! Producer:
//!     TraceContext → encoder.rs (build "00-trace-span-flags")
//!     → Injector (outgoing message metadata)
//!
//! Consumer:
//!     Extractor (delivery headers / metadata)
//!     → decoder.rs (Present | Absent | Malformed)
//!     → legacy.rs fallback when no `traceparent` key exists
//! ```
//!
//! # Design Decisions
//! - Carriers are traits so message metadata, plain maps and HTTP headers
//!   share one codec
//! - Decoding never fails hard; malformed input is a value, not an error path

pub mod decoder;
pub mod encoder;
pub mod legacy;

use std::borrow::Cow;
use std::collections::HashMap;

pub use decoder::{parse, resolve, MalformedTraceparent, Traceparent};
pub use encoder::{attach, build};

/// Reserved metadata key for the W3C trace context.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// The only `traceparent` version this codec reads or writes.
pub const SUPPORTED_VERSION: &str = "00";

/// Write side of a carrier.
pub trait Injector {
    fn set(&mut self, key: &str, value: String);
}

/// Read side of a carrier.
pub trait Extractor {
    fn get(&self, key: &str) -> Option<&str>;

    /// Value under `key` even when it is not valid text.
    ///
    /// Carriers holding raw bytes override this so a present but unreadable
    /// value is still seen as present.
    fn get_lossy(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(Cow::Borrowed)
    }
}

impl Injector for HashMap<String, String> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

impl Extractor for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

impl Injector for axum::http::HeaderMap {
    fn set(&mut self, key: &str, value: String) {
        match (
            axum::http::HeaderName::from_bytes(key.as_bytes()),
            axum::http::HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                self.insert(name, value);
            }
            _ => tracing::warn!(key = %key, "Skipping header that is not valid HTTP"),
        }
    }
}

impl Extractor for axum::http::HeaderMap {
    fn get(&self, key: &str) -> Option<&str> {
        axum::http::HeaderMap::get(self, key).and_then(|v| v.to_str().ok())
    }

    fn get_lossy(&self, key: &str) -> Option<Cow<'_, str>> {
        axum::http::HeaderMap::get(self, key).map(|v| String::from_utf8_lossy(v.as_bytes()))
    }
}
