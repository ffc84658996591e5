//! Estoque Cache - Keyed TTL Cache Facade
//!
//! A namespacing and invalidation layer over an external key-value store
//! with TTL support. Higher-level services (dashboard metrics, sync state,
//! webhook statistics) use it to avoid recomputation and coordinate
//! best-effort freshness.
//!
//! # Design Philosophy
//!
//! The store is the system of record for cached bytes; this layer owns
//! only the logical semantics on top of it:
//!
//! - Keys are built from a closed [`Namespace`] registry plus validated
//!   identifier segments, so logically-equal lookups always serialize to
//!   byte-identical keys.
//! - Expiry is dual-layer: backends physically expire records, and the
//!   facade re-checks logical freshness on every read.
//! - Wildcard invalidation is a scan-based sweep over concrete keys, not
//!   a pattern handed blindly to the store.
//! - Read-modify-write helpers (counters, bounded logs, webhook stats)
//!   are serialized per key, so concurrent updates are never lost.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::new());
//! let cache = CacheFacade::new(store, CacheSettings::from_env());
//!
//! let key = CacheKey::new(Namespace::DashboardMetrics, ["company-1"])?;
//! cache.set(&key, &metrics, Duration::from_secs(300)).await?;
//!
//! if let Some(metrics) = cache.get::<DashboardSnapshot>(&key).await? {
//!     return Ok(metrics); // fresh hit
//! }
//! ```

pub mod accumulator;
pub mod entry;
pub mod facade;
pub mod invalidation;
pub mod key;
pub mod keyed_lock;
pub mod store;

pub use accumulator::{RealtimeCounter, SyncLog, SyncLogEntry, SyncLogLevel, WebhookStats};
pub use entry::CacheEntry;
pub use facade::CacheFacade;
pub use invalidation::{company_sweep, integration_sweep, InvalidationPattern};
pub use key::{CacheKey, KeyPrefix};
pub use keyed_lock::KeyedMutex;
pub use store::{CacheStore, LmdbStore, LmdbStoreError, MemoryStore, StoreStats};

// Re-export the core types callers need alongside the facade.
pub use estoque_core::{CacheError, CacheResult, CacheSettings, Namespace};
