//! Estoque Core - Data Types
//!
//! Pure data structures for the Estoque Mestre cache layer: the namespace
//! registry, the error taxonomy, and the configuration surface. No I/O
//! lives here; behavior belongs to `estoque-cache`.

use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod namespace;

pub use config::CacheSettings;
pub use error::{CacheError, CacheResult};
pub use namespace::{Namespace, NamespaceParseError, TtlClass};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Duration in milliseconds for TTL and timeout values.
pub type DurationMs = i64;
