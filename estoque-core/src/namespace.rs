//! Namespace registry for cache surfaces.
//!
//! Every cache surface the business layer touches is enumerated here, so
//! key construction and invalidation sweeps work against a closed set
//! instead of free-form strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cache surface discriminator.
///
/// The string form is the leading, colon-delimited namespace tag of every
/// key in that surface (e.g. `dashboard:metrics`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Company-wide dashboard snapshot.
    DashboardMetrics,
    /// Sales aggregates per company and period.
    SalesMetrics,
    /// Inventory aggregates per company and period.
    InventoryMetrics,
    /// Metrics scoped to a single entity (product, supplier, customer).
    EntityMetrics,
    /// Rendered report snapshots keyed by report parameters.
    ReportSnapshot,
    /// Integration synchronization state.
    SyncStatus,
    /// Pending sync work items per integration.
    SyncQueue,
    /// Bounded per-integration sync log.
    SyncLogs,
    /// Webhook delivery statistics per integration.
    WebhookStats,
    /// Realtime numeric counters.
    RealtimeCounters,
}

impl Namespace {
    /// All namespaces, in declaration order.
    pub const ALL: [Namespace; 10] = [
        Namespace::DashboardMetrics,
        Namespace::SalesMetrics,
        Namespace::InventoryMetrics,
        Namespace::EntityMetrics,
        Namespace::ReportSnapshot,
        Namespace::SyncStatus,
        Namespace::SyncQueue,
        Namespace::SyncLogs,
        Namespace::WebhookStats,
        Namespace::RealtimeCounters,
    ];

    /// The namespace tag that prefixes every key in this surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::DashboardMetrics => "dashboard:metrics",
            Namespace::SalesMetrics => "sales:metrics",
            Namespace::InventoryMetrics => "inventory:metrics",
            Namespace::EntityMetrics => "entity:metrics",
            Namespace::ReportSnapshot => "report:snapshot",
            Namespace::SyncStatus => "sync:status",
            Namespace::SyncQueue => "sync:queue",
            Namespace::SyncLogs => "sync:logs",
            Namespace::WebhookStats => "webhook:stats",
            Namespace::RealtimeCounters => "realtime:counters",
        }
    }

    /// The TTL class this namespace belongs to.
    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Namespace::DashboardMetrics
            | Namespace::SalesMetrics
            | Namespace::InventoryMetrics
            | Namespace::EntityMetrics
            | Namespace::ReportSnapshot
            | Namespace::RealtimeCounters => TtlClass::Metrics,
            Namespace::SyncStatus
            | Namespace::SyncQueue
            | Namespace::SyncLogs
            | Namespace::WebhookStats => TtlClass::Integration,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = NamespaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .iter()
            .find(|ns| ns.as_str() == s)
            .copied()
            .ok_or_else(|| NamespaceParseError(s.to_string()))
    }
}

/// Error when parsing an unknown namespace tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceParseError(pub String);

impl fmt::Display for NamespaceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown cache namespace: {}", self.0)
    }
}

impl std::error::Error for NamespaceParseError {}

/// TTL class grouping namespaces with a shared default expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TtlClass {
    /// Metric and report surfaces. Default 300 s.
    Metrics,
    /// Integration sync surfaces. Default 600 s.
    Integration,
}
