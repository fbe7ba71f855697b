//! Trace and span identifiers.
//!
//! # Responsibilities
//! - Strongly typed 16-byte trace IDs and 8-byte span IDs
//! - Lowercase hex rendering and strict parsing
//! - Random generation that never yields an all-zero identifier
//!
//! # Design Decisions
//! - Identifiers are non-zero by construction; there is no "invalid" value
//! - Generation draws from `rand::thread_rng()` (CSPRNG, OS-seeded), so
//!   concurrent callers never share state

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing an identifier from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier has the wrong number of characters.
    #[error("expected {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },

    /// Identifier contains a character outside `[0-9a-f]`.
    #[error("identifier must be lowercase hex")]
    Alphabet,

    /// Identifier is all zeros.
    #[error("identifier must not be all zeros")]
    AllZero,
}

fn check_lower_hex(s: &str, expected: usize) -> Result<(), IdError> {
    if s.len() != expected {
        return Err(IdError::Length {
            expected,
            actual: s.len(),
        });
    }
    if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(IdError::Alphabet);
    }
    Ok(())
}

/// A 128-bit trace identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

impl TraceId {
    /// Wrap raw bytes. Returns `None` for the all-zero value.
    pub fn from_bytes(bytes: [u8; 16]) -> Option<Self> {
        if bytes == [0u8; 16] {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl FromStr for TraceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_lower_hex(s, 32)?;
        let value = u128::from_str_radix(s, 16).map_err(|_| IdError::Alphabet)?;
        Self::from_bytes(value.to_be_bytes()).ok_or(IdError::AllZero)
    }
}

/// A 64-bit span identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

impl SpanId {
    /// Wrap raw bytes. Returns `None` for the all-zero value.
    pub fn from_bytes(bytes: [u8; 8]) -> Option<Self> {
        if bytes == [0u8; 8] {
            None
        } else {
            Some(Self(bytes))
        }
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", u64::from_be_bytes(self.0))
    }
}

impl FromStr for SpanId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_lower_hex(s, 16)?;
        let value = u64::from_str_radix(s, 16).map_err(|_| IdError::Alphabet)?;
        Self::from_bytes(value.to_be_bytes()).ok_or(IdError::AllZero)
    }
}

macro_rules! impl_hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_hex_serde!(TraceId);
impl_hex_serde!(SpanId);

/// Source of new trace and span identifiers.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Generate a new `TraceId`.
    fn new_trace_id(&self) -> TraceId;

    /// Generate a new `SpanId`.
    fn new_span_id(&self) -> SpanId;
}

/// Default [`IdGenerator`] backed by the thread-local CSPRNG.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        TraceId(draw_nonzero(|buf| rand::thread_rng().fill_bytes(buf)))
    }

    fn new_span_id(&self) -> SpanId {
        SpanId(draw_nonzero(|buf| rand::thread_rng().fill_bytes(buf)))
    }
}

/// Fill `N` bytes from `fill`, redrawing while the result is all zeros.
fn draw_nonzero<const N: usize>(mut fill: impl FnMut(&mut [u8])) -> [u8; N] {
    let mut bytes = [0u8; N];
    loop {
        fill(&mut bytes);
        if bytes.iter().any(|b| *b != 0) {
            return bytes;
        }
        tracing::debug!(len = N, "Drew all-zero identifier, redrawing");
    }
}

/// Generate a random trace ID as 32 lowercase hex characters.
pub fn generate_trace_id() -> String {
    RandomIdGenerator::default().new_trace_id().to_string()
}

/// Generate a random span ID as 16 lowercase hex characters.
pub fn generate_span_id() -> String {
    RandomIdGenerator::default().new_span_id().to_string()
}
