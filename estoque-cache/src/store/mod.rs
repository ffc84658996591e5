//! Store protocol and backends.
//!
//! The facade speaks a byte-level protocol to pluggable backends. Physical
//! TTL expiry is the backend's job: a record past its expiry is reported
//! absent, whether or not it has been vacuumed yet.

use async_trait::async_trait;
use estoque_core::CacheResult;
use std::time::Duration;

pub mod lmdb;
pub mod memory;

pub use lmdb::{LmdbStore, LmdbStoreError};
pub use memory::MemoryStore;

/// Byte-level protocol for an external key-value store with TTL support.
///
/// Implementations must be thread-safe; the facade never holds a lock
/// across a store call. Deleting an absent key is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up raw bytes. Physically-expired records are reported absent.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Write raw bytes with an optional physical expiry window.
    ///
    /// `None` means no store-side expiry; the logical check in the facade
    /// is then the only staleness gate.
    async fn put(&self, key: &str, bytes: &[u8], ttl: Option<Duration>) -> CacheResult<()>;

    /// Delete a key. Returns whether a live record was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Enumerate live keys under a prefix, for scan-based invalidation.
    ///
    /// The prefix matches whole segments: `sync:logs:int-1` does not
    /// enumerate `sync:logs:int-10`.
    async fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<String>>;

    /// Usage statistics.
    async fn stats(&self) -> CacheResult<StoreStats>;
}

/// Statistics about store usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of lookups that found a live record.
    pub hits: u64,
    /// Number of lookups that found nothing (or an expired record).
    pub misses: u64,
    /// Number of live records.
    pub entry_count: u64,
    /// Number of records dropped through physical expiry.
    pub expirations: u64,
}

impl StoreStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Whether an encoded key falls under a scan prefix at a segment boundary.
pub(crate) fn key_under_prefix(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(':'),
        None => false,
    }
}
