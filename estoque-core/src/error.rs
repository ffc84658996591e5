//! Error types for cache operations.
//!
//! The cache is an optimization layer: its failures degrade latency, not
//! correctness. The one exception is the timeout-vs-miss distinction —
//! a store timeout must surface as an error so outages are not masked as
//! cold caches.

use std::time::Duration;
use thiserror::Error;

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The store could not be reached or rejected the operation.
    ///
    /// Callers should fall back to direct recomputation.
    #[error("Cache store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A store operation did not complete within the configured timeout.
    ///
    /// Deliberately distinct from a miss: treating a timeout as a cold
    /// cache would hide store outages.
    #[error("Cache store operation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// A value could not be serialized for storage.
    #[error("Serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// Stored bytes did not match the expected envelope shape.
    ///
    /// Callers treat this as a miss; the facade logs and recomputes.
    #[error("Deserialization failed for key {key}: {reason}")]
    Deserialization { key: String, reason: String },

    /// A key segment was empty or contained the `:` delimiter.
    ///
    /// Rejected before any store round-trip.
    #[error("Invalid cache key segment {segment:?}: {reason}")]
    InvalidKey { segment: String, reason: String },
}

impl CacheError {
    /// True if this error indicates the store itself is unhealthy
    /// (as opposed to a bad key or payload).
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            CacheError::StoreUnavailable { .. } | CacheError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_classification() {
        let unavailable = CacheError::StoreUnavailable {
            reason: "connection refused".to_string(),
        };
        let timeout = CacheError::Timeout {
            elapsed: Duration::from_millis(250),
        };
        let invalid = CacheError::InvalidKey {
            segment: "a:b".to_string(),
            reason: "contains delimiter".to_string(),
        };

        assert!(unavailable.is_store_failure());
        assert!(timeout.is_store_failure());
        assert!(!invalid.is_store_failure());
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::Deserialization {
            key: "dashboard:metrics:company-1".to_string(),
            reason: "missing field".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("dashboard:metrics:company-1"));
        assert!(msg.contains("missing field"));
    }
}
