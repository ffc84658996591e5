//! Cache entry envelope and logical freshness.
//!
//! Expiry is dual-layer: backends physically expire records, and the
//! facade re-checks logical freshness here on every read. The store may
//! still hand back a physically-present but logically-stale record
//! depending on its TTL granularity, so this check is in addition to the
//! store's own expiry, not instead of it.

use chrono::{DateTime, Utc};
use estoque_core::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value stamped with its write time and validity window.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// Caller-defined payload.
    pub value: T,
    /// Wall-clock time of the write.
    pub stored_at: DateTime<Utc>,
    /// Validity window. Zero means immediate expiry, never "infinite".
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Create an entry stamped with the current time.
    pub fn now(value: T, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
            ttl,
        }
    }

    /// Whether the entry is fresh at `now`: `now - stored_at < ttl`.
    ///
    /// A zero TTL is always stale. A `now` earlier than `stored_at`
    /// (clock skew) counts as age zero.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let age = now
            .signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }

    /// How old the entry is at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Wire form of a cache entry.
///
/// Millisecond integers keep the envelope stable across serde versions
/// and make the stored bytes inspectable with any JSON tooling.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    stored_at_ms: i64,
    ttl_ms: u64,
    value: T,
}

impl<T: Serialize> CacheEntry<T> {
    /// Serialize the entry into store bytes.
    pub fn to_bytes(&self, key: &str) -> CacheResult<Vec<u8>> {
        let envelope = Envelope {
            stored_at_ms: self.stored_at.timestamp_millis(),
            ttl_ms: self.ttl.as_millis() as u64,
            value: &self.value,
        };
        serde_json::to_vec(&envelope).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

impl<T: DeserializeOwned> CacheEntry<T> {
    /// Deserialize store bytes back into an entry.
    ///
    /// Bytes that do not match the envelope shape yield
    /// [`CacheError::Deserialization`]; the facade treats that as a miss.
    pub fn from_bytes(bytes: &[u8], key: &str) -> CacheResult<Self> {
        let envelope: Envelope<T> =
            serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        let stored_at = DateTime::from_timestamp_millis(envelope.stored_at_ms).ok_or_else(|| {
            CacheError::Deserialization {
                key: key.to_string(),
                reason: format!("timestamp out of range: {}", envelope.stored_at_ms),
            }
        })?;
        Ok(Self {
            value: envelope.value,
            stored_at,
            ttl: Duration::from_millis(envelope.ttl_ms),
        })
    }
}
