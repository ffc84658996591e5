//! Configuration for the cache layer.
//!
//! TTLs arrive from the environment in seconds and are held as `Duration`
//! past this boundary. Unset variables fall back to per-class defaults.

use crate::namespace::{Namespace, TtlClass};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTL for metric namespaces (300 s).
const DEFAULT_METRICS_TTL: Duration = Duration::from_secs(300);

/// Default TTL for integration namespaces (600 s).
const DEFAULT_INTEGRATION_TTL: Duration = Duration::from_secs(600);

/// Default timeout for a single store operation.
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Environment variable names.
const ENV_METRICS_TTL_SECS: &str = "ESTOQUE_CACHE_METRICS_TTL_SECS";
const ENV_INTEGRATION_TTL_SECS: &str = "ESTOQUE_CACHE_INTEGRATION_TTL_SECS";
const ENV_OP_TIMEOUT_MS: &str = "ESTOQUE_CACHE_OP_TIMEOUT_MS";

/// Settings consumed by the cache facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL applied to metric and report namespaces.
    pub metrics_ttl: Duration,
    /// TTL applied to integration sync namespaces.
    pub integration_ttl: Duration,
    /// Timeout for a single store operation. On expiry the facade
    /// reports a failure, never a miss.
    pub op_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            metrics_ttl: DEFAULT_METRICS_TTL,
            integration_ttl: DEFAULT_INTEGRATION_TTL,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

impl CacheSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from the environment, falling back to defaults for
    /// unset or unparseable variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(secs) = read_env_u64(ENV_METRICS_TTL_SECS) {
            settings.metrics_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = read_env_u64(ENV_INTEGRATION_TTL_SECS) {
            settings.integration_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = read_env_u64(ENV_OP_TIMEOUT_MS) {
            settings.op_timeout = Duration::from_millis(ms);
        }
        settings
    }

    /// Set the metrics TTL.
    pub fn with_metrics_ttl(mut self, ttl: Duration) -> Self {
        self.metrics_ttl = ttl;
        self
    }

    /// Set the integration TTL.
    pub fn with_integration_ttl(mut self, ttl: Duration) -> Self {
        self.integration_ttl = ttl;
        self
    }

    /// Set the store operation timeout.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Resolve the effective TTL for a namespace.
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        match namespace.ttl_class() {
            TtlClass::Metrics => self.metrics_ttl,
            TtlClass::Integration => self.integration_ttl,
        }
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
