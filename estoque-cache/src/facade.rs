//! The cache facade.
//!
//! Routes typed reads and writes through a byte-level [`CacheStore`],
//! layering on canonical keys, logical freshness, timeout discipline,
//! per-key serialization for read-modify-write, and scan-based
//! invalidation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use estoque_core::{CacheError, CacheResult, CacheSettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::entry::CacheEntry;
use crate::invalidation::InvalidationPattern;
use crate::key::CacheKey;
use crate::keyed_lock::KeyedMutex;
use crate::store::{CacheStore, StoreStats};

/// Namespacing and invalidation layer over an external key-value store.
///
/// The facade owns no durable state; the store is the system of record
/// for cached bytes. Construction takes the store handle explicitly —
/// there is no ambient global client.
pub struct CacheFacade<S: CacheStore> {
    store: Arc<S>,
    settings: CacheSettings,
    update_locks: KeyedMutex,
}

impl<S: CacheStore> CacheFacade<S> {
    /// Create a facade over a store handle.
    pub fn new(store: Arc<S>, settings: CacheSettings) -> Self {
        Self {
            store,
            settings,
            update_locks: KeyedMutex::new(),
        }
    }

    /// Create a facade with default settings.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, CacheSettings::default())
    }

    /// The facade settings.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// A reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up a value.
    ///
    /// Returns `Ok(None)` on a miss, on a logically-stale entry (no
    /// implicit deletion; the caller recomputes and overwrites), and on a
    /// malformed envelope (logged). A store timeout or connectivity
    /// failure is an error, never a miss — treating it as a cold cache
    /// would mask outages.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        let encoded = key.encode();
        let Some(bytes) = self.bounded(self.store.get(&encoded)).await?? else {
            return Ok(None);
        };

        let entry: CacheEntry<T> = match CacheEntry::from_bytes(&bytes, &encoded) {
            Ok(entry) => entry,
            Err(CacheError::Deserialization { key, reason }) => {
                warn!(%key, %reason, "discarding undecodable cache entry");
                return Ok(None);
            }
            Err(other) => return Err(other),
        };

        if entry.is_fresh(chrono::Utc::now()) {
            Ok(Some(entry.value))
        } else {
            Ok(None)
        }
    }

    /// Write a value with an explicit TTL.
    ///
    /// The entry is stamped with the current time and the same TTL is
    /// handed to the store for physical expiry (dual-layer expiry). A
    /// zero TTL writes an entry that is stale on arrival.
    pub async fn set<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let encoded = key.encode();
        let entry = CacheEntry::now(value, ttl);
        let bytes = entry.to_bytes(&encoded)?;
        self.bounded(self.store.put(&encoded, &bytes, Some(ttl)))
            .await?
    }

    /// Write a value with the namespace's configured TTL.
    pub async fn set_with_default_ttl<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> CacheResult<()> {
        let ttl = self.settings.ttl_for(key.namespace());
        self.set(key, value, ttl).await
    }

    /// Remove a single key. Removing an absent key is not an error.
    pub async fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let encoded = key.encode();
        self.bounded(self.store.delete(&encoded)).await?
    }

    /// Serialized read-modify-write on one key.
    ///
    /// The closure receives the current fresh value (or `None`) and
    /// returns the replacement, which is written back with `ttl`. Updates
    /// to the same key are serialized through a per-key mutex, so
    /// concurrent callers never lose increments.
    pub async fn update<T, F>(&self, key: &CacheKey, ttl: Duration, mutate: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let encoded = key.encode();
        let _guard = self.update_locks.acquire(&encoded).await;

        let current = self.get::<T>(key).await?;
        let updated = mutate(current);
        self.set(key, &updated, ttl).await?;
        Ok(updated)
    }

    /// Sweep a set of invalidation patterns. Returns the number of keys
    /// removed.
    ///
    /// Exact patterns delete directly. Prefix patterns are expanded to
    /// concrete keys via a store scan, then each key is deleted — the
    /// store's delete never interprets wildcards. The sweep is
    /// idempotent: a second identical call removes nothing and is not an
    /// error. Store failures propagate, since a failed invalidation
    /// leaves callers reading stale business data for the rest of the
    /// TTL window.
    pub async fn invalidate(&self, patterns: &[InvalidationPattern]) -> CacheResult<u64> {
        let mut removed = 0u64;
        for pattern in patterns {
            match pattern {
                InvalidationPattern::Exact(key) => {
                    let encoded = key.encode();
                    if self.bounded(self.store.delete(&encoded)).await?? {
                        removed += 1;
                    }
                }
                InvalidationPattern::Prefix(prefix) => {
                    let encoded_prefix = prefix.encode();
                    let keys = self
                        .bounded(self.store.scan_prefix(&encoded_prefix))
                        .await??;
                    for key in keys {
                        if self.bounded(self.store.delete(&key)).await?? {
                            removed += 1;
                        }
                    }
                }
            }
        }
        debug!(removed, patterns = patterns.len(), "invalidation sweep");
        Ok(removed)
    }

    /// Store usage statistics.
    pub async fn stats(&self) -> CacheResult<StoreStats> {
        self.bounded(self.store.stats()).await?
    }

    /// Run a store operation under the configured timeout.
    ///
    /// Elapsed timeouts become [`CacheError::Timeout`]; the inner result
    /// is returned untouched for the caller to `?`.
    async fn bounded<F, T>(&self, op: F) -> CacheResult<CacheResult<T>>
    where
        F: Future<Output = CacheResult<T>>,
    {
        let timeout = self.settings.op_timeout;
        match tokio::time::timeout(timeout, op).await {
            Ok(result) => Ok(result),
            Err(_) => Err(CacheError::Timeout { elapsed: timeout }),
        }
    }
}
