//! Invalidation patterns and preset sweep sets.
//!
//! Patterns are transient: built per call, never persisted. A sweep is a
//! one-shot idempotent pass; no ordering is guaranteed against concurrent
//! `set` calls on the same keys (last-writer-wins is acceptable for a
//! cache that is not a source of truth).

use estoque_core::{CacheResult, Namespace};

use crate::key::{CacheKey, KeyPrefix};

/// A set of keys to remove together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvalidationPattern {
    /// One concrete key, deleted directly.
    Exact(CacheKey),
    /// Every key under a prefix, expanded via a store scan before
    /// deletion.
    Prefix(KeyPrefix),
}

impl From<CacheKey> for InvalidationPattern {
    fn from(key: CacheKey) -> Self {
        InvalidationPattern::Exact(key)
    }
}

impl From<KeyPrefix> for InvalidationPattern {
    fn from(prefix: KeyPrefix) -> Self {
        InvalidationPattern::Prefix(prefix)
    }
}

/// Every cache surface touched by one company's metrics and reports.
///
/// Used after bulk mutations (imports, stock corrections) that make all
/// derived numbers for the company suspect.
pub fn company_sweep(company_id: &str) -> CacheResult<Vec<InvalidationPattern>> {
    let surfaces = [
        Namespace::DashboardMetrics,
        Namespace::SalesMetrics,
        Namespace::InventoryMetrics,
        Namespace::EntityMetrics,
        Namespace::ReportSnapshot,
        Namespace::RealtimeCounters,
    ];
    surfaces
        .into_iter()
        .map(|ns| Ok(KeyPrefix::scoped(ns, [company_id])?.into()))
        .collect()
}

/// Every cache surface touched by one integration.
///
/// Used when an integration is reconfigured, disconnected, or resynced
/// from scratch.
pub fn integration_sweep(integration_id: &str) -> CacheResult<Vec<InvalidationPattern>> {
    let surfaces = [
        Namespace::SyncStatus,
        Namespace::SyncQueue,
        Namespace::SyncLogs,
        Namespace::WebhookStats,
    ];
    surfaces
        .into_iter()
        .map(|ns| Ok(KeyPrefix::scoped(ns, [integration_id])?.into()))
        .collect()
}
