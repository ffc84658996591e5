//! Read-modify-write accumulators: webhook statistics, bounded sync logs,
//! and realtime counters.
//!
//! All three follow the same shape: load the current value (or a
//! default), mutate, write back. The facade serializes each key's
//! updates, so concurrent callers never lose increments or log entries.

use chrono::{DateTime, Utc};
use estoque_core::{CacheResult, Namespace};
use serde::{Deserialize, Serialize};

use crate::facade::CacheFacade;
use crate::key::CacheKey;
use crate::store::CacheStore;

/// Maximum number of retained sync log entries per integration.
pub const SYNC_LOG_CAP: usize = 50;

/// Webhook delivery statistics for one integration.
///
/// Counters are monotone; `last_error` holds only the most recent
/// failure message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookStats {
    pub success_count: u64,
    pub failure_count: u64,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl WebhookStats {
    fn key(integration_id: &str) -> CacheResult<CacheKey> {
        CacheKey::new(Namespace::WebhookStats, [integration_id])
    }

    /// Record a successful delivery and return the updated stats.
    pub async fn record_success<S: CacheStore>(
        cache: &CacheFacade<S>,
        integration_id: &str,
    ) -> CacheResult<Self> {
        let key = Self::key(integration_id)?;
        let ttl = cache.settings().ttl_for(Namespace::WebhookStats);
        cache
            .update(&key, ttl, |current: Option<Self>| {
                let mut stats = current.unwrap_or_default();
                stats.success_count += 1;
                stats.last_triggered_at = Some(Utc::now());
                stats
            })
            .await
    }

    /// Record a failed delivery and return the updated stats.
    pub async fn record_failure<S: CacheStore>(
        cache: &CacheFacade<S>,
        integration_id: &str,
        error: &str,
    ) -> CacheResult<Self> {
        let key = Self::key(integration_id)?;
        let ttl = cache.settings().ttl_for(Namespace::WebhookStats);
        let error = error.to_string();
        cache
            .update(&key, ttl, move |current: Option<Self>| {
                let mut stats = current.unwrap_or_default();
                stats.failure_count += 1;
                stats.last_triggered_at = Some(Utc::now());
                stats.last_error = Some(error);
                stats
            })
            .await
    }

    /// Load current stats, if any are cached and fresh.
    pub async fn load<S: CacheStore>(
        cache: &CacheFacade<S>,
        integration_id: &str,
    ) -> CacheResult<Option<Self>> {
        cache.get(&Self::key(integration_id)?).await
    }
}

/// Severity of a sync log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncLogLevel {
    Info,
    Warning,
    Error,
}

/// One entry in an integration's sync log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub at: DateTime<Utc>,
    pub level: SyncLogLevel,
    pub message: String,
}

impl SyncLogEntry {
    /// Create an entry stamped with the current time.
    pub fn now<M: Into<String>>(level: SyncLogLevel, message: M) -> Self {
        Self {
            at: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

/// Bounded, newest-first sync log for one integration.
///
/// Insertion beyond [`SYNC_LOG_CAP`] evicts the oldest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLog {
    pub entries: Vec<SyncLogEntry>,
}

impl SyncLog {
    fn key(integration_id: &str) -> CacheResult<CacheKey> {
        CacheKey::new(Namespace::SyncLogs, [integration_id])
    }

    /// Prepend an entry, evicting past the cap. Newest entry is index 0.
    pub fn push(&mut self, entry: SyncLogEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(SYNC_LOG_CAP);
    }

    /// Append an entry to an integration's cached log and return the
    /// updated log.
    pub async fn append<S: CacheStore>(
        cache: &CacheFacade<S>,
        integration_id: &str,
        entry: SyncLogEntry,
    ) -> CacheResult<Self> {
        let key = Self::key(integration_id)?;
        let ttl = cache.settings().ttl_for(Namespace::SyncLogs);
        cache
            .update(&key, ttl, move |current: Option<Self>| {
                let mut log = current.unwrap_or_default();
                log.push(entry);
                log
            })
            .await
    }

    /// Load an integration's cached log, if fresh.
    pub async fn load<S: CacheStore>(
        cache: &CacheFacade<S>,
        integration_id: &str,
    ) -> CacheResult<Option<Self>> {
        cache.get(&Self::key(integration_id)?).await
    }
}

/// A realtime numeric accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeCounter {
    pub value: i64,
}

impl RealtimeCounter {
    fn key(name: &str) -> CacheResult<CacheKey> {
        CacheKey::new(Namespace::RealtimeCounters, [name])
    }

    /// Add `delta` to the named counter and return the new value.
    ///
    /// Exact under concurrency: updates on the same counter are
    /// serialized per key.
    pub async fn increment<S: CacheStore>(
        cache: &CacheFacade<S>,
        name: &str,
        delta: i64,
    ) -> CacheResult<i64> {
        let key = Self::key(name)?;
        let ttl = cache.settings().ttl_for(Namespace::RealtimeCounters);
        let updated = cache
            .update(&key, ttl, move |current: Option<Self>| Self {
                value: current.map_or(0, |c| c.value) + delta,
            })
            .await?;
        Ok(updated.value)
    }

    /// Read the named counter, if fresh. Absent counters read as zero.
    pub async fn read<S: CacheStore>(cache: &CacheFacade<S>, name: &str) -> CacheResult<i64> {
        let counter: Option<Self> = cache.get(&Self::key(name)?).await?;
        Ok(counter.map_or(0, |c| c.value))
    }
}
