//! In-memory store backend.
//!
//! Expiry is lazy: a record past its deadline is dropped when a read or
//! scan touches it. TTL expiry is self-cleaning, so no background sweep
//! is required for correctness.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use estoque_core::CacheResult;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use super::{key_under_prefix, CacheStore, StoreStats};

#[derive(Debug, Clone)]
struct Record {
    bytes: Vec<u8>,
    /// None means no physical expiry.
    expires_at: Option<DateTime<Utc>>,
}

impl Record {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Process-local store, the default backend for tests and single-node
/// deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
    stats: RwLock<StoreStats>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired or not.
    ///
    /// Test helper; `stats().entry_count` reports live records.
    pub fn raw_len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    fn record_expiration(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.expirations += 1;
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Utc::now();
        let expired = {
            let records = self
                .records
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match records.get(key) {
                Some(record) if !record.is_expired(now) => {
                    self.record_hit();
                    return Ok(Some(record.bytes.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut records = self
                .records
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Re-check under the write lock; a concurrent put may have
            // replaced the record.
            if records.get(key).is_some_and(|r| r.is_expired(now)) {
                records.remove(key);
                self.record_expiration();
            }
        }
        self.record_miss();
        Ok(None)
    }

    async fn put(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|ttl| {
            Utc::now()
                + TimeDelta::from_std(ttl).unwrap_or_else(|_| TimeDelta::seconds(i32::MAX as i64))
        });
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(
            key.to_string(),
            Record {
                bytes: bytes.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Utc::now();
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match records.remove(key) {
            Some(record) => Ok(!record.is_expired(now)),
            None => Ok(false),
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<String>> {
        let now = Utc::now();
        let records = self
            .records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut keys: Vec<String> = records
            .iter()
            .filter(|(key, record)| key_under_prefix(key, prefix) && !record.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn stats(&self) -> CacheResult<StoreStats> {
        let now = Utc::now();
        let live = {
            let records = self
                .records
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            records.values().filter(|r| !r.is_expired(now)).count() as u64
        };
        let mut stats = self
            .stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.entry_count = live;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryStore::new();
        store
            .put("sync:status:int-1", b"payload", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");

        let bytes = store.get("sync:status:int-1").await.expect("get should succeed");
        assert_eq!(bytes.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let store = MemoryStore::new();
        let bytes = store.get("sync:status:missing").await.expect("get should succeed");
        assert!(bytes.is_none());
    }

    #[tokio::test]
    async fn test_physical_expiry_reports_absent() {
        let store = MemoryStore::new();
        store
            .put("realtime:counters:orders", b"1", Some(Duration::ZERO))
            .await
            .expect("put should succeed");

        let bytes = store
            .get("realtime:counters:orders")
            .await
            .expect("get should succeed");
        assert!(bytes.is_none());
        // Lazy expiry dropped the record.
        assert_eq!(store.raw_len(), 0);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires_physically() {
        let store = MemoryStore::new();
        store
            .put("sync:status:int-1", b"payload", None)
            .await
            .expect("put should succeed");
        let bytes = store.get("sync:status:int-1").await.expect("get should succeed");
        assert!(bytes.is_some());
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok_false() {
        let store = MemoryStore::new();
        let removed = store.delete("sync:status:missing").await.expect("delete ok");
        assert!(!removed);
    }

    #[tokio::test]
    async fn test_scan_prefix_respects_segment_boundary() {
        let store = MemoryStore::new();
        for key in ["sync:logs:int-1", "sync:logs:int-1:p2", "sync:logs:int-10"] {
            store
                .put(key, b"x", Some(Duration::from_secs(60)))
                .await
                .expect("put should succeed");
        }

        let keys = store.scan_prefix("sync:logs:int-1").await.expect("scan ok");
        assert_eq!(keys, vec!["sync:logs:int-1", "sync:logs:int-1:p2"]);
    }

    #[tokio::test]
    async fn test_scan_skips_expired() {
        let store = MemoryStore::new();
        store
            .put("sync:logs:int-1", b"x", Some(Duration::ZERO))
            .await
            .expect("put should succeed");
        store
            .put("sync:logs:int-2", b"x", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");

        let keys = store.scan_prefix("sync:logs").await.expect("scan ok");
        assert_eq!(keys, vec!["sync:logs:int-2"]);
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let store = MemoryStore::new();
        store
            .put("sync:status:int-1", b"x", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");

        let _ = store.get("sync:status:int-1").await;
        let _ = store.get("sync:status:int-1").await;
        let _ = store.get("sync:status:missing").await;

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }
}
