//! LMDB-backed store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a persistent,
//! memory-mapped backend. Records are framed as
//! `[expires_at_ms: 8 LE bytes][payload]`, with 0 meaning no physical
//! expiry. Like the memory backend, expiry is lazy: expired records are
//! reported absent on read and skipped by scans.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Read transactions serve `get` and
//! `scan_prefix`; write transactions serve `put` and `delete`. Statistics
//! are tracked per namespace behind an `RwLock`.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use estoque_core::{CacheError, CacheResult, Namespace};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use std::time::Duration;

use super::{key_under_prefix, CacheStore, StoreStats};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A stored record was too short to carry the expiry frame.
    #[error("Corrupt record for key {0}")]
    CorruptRecord(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for CacheError {
    fn from(e: LmdbStoreError) -> Self {
        CacheError::StoreUnavailable {
            reason: e.to_string(),
        }
    }
}

/// Persistent store backend over LMDB.
pub struct LmdbStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    /// Hit/miss counts per namespace tag.
    namespace_stats: RwLock<HashMap<Namespace, StoreStats>>,
    global_stats: RwLock<StoreStats>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store at `path` with the given map size.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            namespace_stats: RwLock::new(HashMap::new()),
            global_stats: RwLock::new(StoreStats::default()),
        })
    }

    /// Statistics for one namespace.
    pub fn namespace_stats(&self, namespace: Namespace) -> StoreStats {
        self.namespace_stats
            .read()
            .ok()
            .and_then(|stats| stats.get(&namespace).cloned())
            .unwrap_or_default()
    }

    fn record_hit(&self, key: &str) {
        self.bump(key, |s| s.hits += 1);
    }

    fn record_miss(&self, key: &str) {
        self.bump(key, |s| s.misses += 1);
    }

    fn record_expiration(&self, key: &str) {
        self.bump(key, |s| s.expirations += 1);
    }

    fn bump(&self, key: &str, f: impl Fn(&mut StoreStats)) {
        if let Some(namespace) = namespace_of(key) {
            if let Ok(mut stats) = self.namespace_stats.write() {
                f(stats.entry(namespace).or_default());
            }
        }
        if let Ok(mut stats) = self.global_stats.write() {
            f(&mut stats);
        }
    }

    /// Frame a record: `[expires_at_ms: 8 LE bytes][payload]`.
    fn frame(bytes: &[u8], ttl: Option<Duration>) -> Vec<u8> {
        let expires_at_ms: i64 = match ttl {
            Some(ttl) => {
                let deadline = Utc::now()
                    + TimeDelta::from_std(ttl)
                        .unwrap_or_else(|_| TimeDelta::seconds(i32::MAX as i64));
                deadline.timestamp_millis()
            }
            None => 0,
        };
        let mut framed = Vec::with_capacity(8 + bytes.len());
        framed.extend_from_slice(&expires_at_ms.to_le_bytes());
        framed.extend_from_slice(bytes);
        framed
    }

    /// Split a framed record. Returns `(expired, payload)`.
    fn unframe<'r>(record: &'r [u8], key: &str) -> Result<(bool, &'r [u8]), LmdbStoreError> {
        if record.len() < 8 {
            return Err(LmdbStoreError::CorruptRecord(key.to_string()));
        }
        let expires_at_ms = i64::from_le_bytes(
            record[0..8]
                .try_into()
                .map_err(|_| LmdbStoreError::CorruptRecord(key.to_string()))?,
        );
        let expired = expires_at_ms != 0
            && DateTime::from_timestamp_millis(expires_at_ms)
                .is_some_and(|deadline| Utc::now() >= deadline);
        Ok((expired, &record[8..]))
    }
}

/// Parse the namespace tag off an encoded key. Tags are the first two
/// colon-delimited components.
fn namespace_of(key: &str) -> Option<Namespace> {
    let mut parts = key.splitn(3, ':');
    let tag = format!("{}:{}", parts.next()?, parts.next()?);
    Namespace::from_str(&tag).ok()
}

#[async_trait]
impl CacheStore for LmdbStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        match self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
        {
            Some(record) => {
                let (expired, payload) = Self::unframe(record, key)?;
                if expired {
                    self.record_expiration(key);
                    self.record_miss(key);
                    Ok(None)
                } else {
                    self.record_hit(key);
                    Ok(Some(payload.to_vec()))
                }
            }
            None => {
                self.record_miss(key);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        let framed = Self::frame(bytes, ttl);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &framed)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        // Expired-but-present records count as absent for the caller.
        let was_live = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            match self
                .db
                .get(&rtxn, key.as_bytes())
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                Some(record) => !Self::unframe(record, key)?.0,
                None => false,
            }
        };

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let removed = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(removed && was_live)
    }

    async fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<String>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        for result in iter {
            let (raw_key, record) =
                result.map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            let Ok(key) = std::str::from_utf8(raw_key) else {
                continue;
            };
            if !key_under_prefix(key, prefix) {
                continue;
            }
            let (expired, _) = Self::unframe(record, key)?;
            if !expired {
                keys.push(key.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn stats(&self) -> CacheResult<StoreStats> {
        let mut stats = self
            .global_stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default();

        // Live entry count requires a walk; LMDB's own count includes
        // expired-but-unvacuumed records.
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut live = 0u64;
        for result in iter {
            let (raw_key, record) =
                result.map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            let key = std::str::from_utf8(raw_key).unwrap_or_default();
            if !Self::unframe(record, key)?.0 {
                live += 1;
            }
        }
        stats.entry_count = live;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::open(temp_dir.path(), 10).expect("store should open");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("sync:status:int-1", b"payload", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");

        let bytes = store.get("sync:status:int-1").await.expect("get should succeed");
        assert_eq!(bytes.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn test_expired_record_reported_absent() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("sync:status:int-1", b"payload", Some(Duration::ZERO))
            .await
            .expect("put should succeed");

        let bytes = store.get("sync:status:int-1").await.expect("get should succeed");
        assert!(bytes.is_none());
    }

    #[tokio::test]
    async fn test_no_ttl_persists() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("dashboard:metrics:c1", b"payload", None)
            .await
            .expect("put should succeed");

        let bytes = store.get("dashboard:metrics:c1").await.expect("get should succeed");
        assert!(bytes.is_some());
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("sync:queue:int-1", b"x", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");

        assert!(store.delete("sync:queue:int-1").await.expect("delete ok"));
        assert!(!store.delete("sync:queue:int-1").await.expect("delete ok"));
        assert!(!store.delete("sync:queue:never-there").await.expect("delete ok"));
    }

    #[tokio::test]
    async fn test_scan_prefix_boundary_and_expiry() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("sync:logs:int-1", b"x", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");
        store
            .put("sync:logs:int-10", b"x", Some(Duration::from_secs(60)))
            .await
            .expect("put should succeed");
        store
            .put("sync:logs:int-1:p2", b"x", Some(Duration::ZERO))
            .await
            .expect("put should succeed");

        let keys = store.scan_prefix("sync:logs:int-1").await.expect("scan ok");
        assert_eq!(keys, vec!["sync:logs:int-1"]);
    }

    #[tokio::test]
    async fn test_reopen_preserves_records() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let store = LmdbStore::open(temp_dir.path(), 10).expect("store should open");
            store
                .put("report:snapshot:c1", b"persisted", None)
                .await
                .expect("put should succeed");
        }

        let store = LmdbStore::open(temp_dir.path(), 10).expect("store should reopen");
        let bytes = store.get("report:snapshot:c1").await.expect("get should succeed");
        assert_eq!(bytes.as_deref(), Some(b"persisted".as_slice()));
    }

    #[tokio::test]
    async fn test_namespace_stats_isolation() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("dashboard:metrics:c1", b"x", None)
            .await
            .expect("put should succeed");

        let _ = store.get("dashboard:metrics:c1").await;
        let _ = store.get("dashboard:metrics:c1").await;
        let _ = store.get("sync:status:int-1").await;

        let dashboard = store.namespace_stats(Namespace::DashboardMetrics);
        let sync = store.namespace_stats(Namespace::SyncStatus);
        assert_eq!(dashboard.hits, 2);
        assert_eq!(dashboard.misses, 0);
        assert_eq!(sync.hits, 0);
        assert_eq!(sync.misses, 1);
    }

    #[tokio::test]
    async fn test_stats_count_live_entries() {
        let (store, _temp_dir) = create_test_store();
        store
            .put("sync:status:a", b"x", None)
            .await
            .expect("put should succeed");
        store
            .put("sync:status:b", b"x", Some(Duration::ZERO))
            .await
            .expect("put should succeed");

        let stats = store.stats().await.expect("stats should succeed");
        assert_eq!(stats.entry_count, 1);
    }
}
