//! Per-key async mutex map.
//!
//! Read-modify-write accumulators (counters, bounded logs, webhook stats)
//! are classic lost-update races when two callers hit the same key. The
//! facade serializes those updates through one mutex per encoded key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map size above which uncontended entries are pruned on acquire.
const PRUNE_THRESHOLD: usize = 64;

/// A mutex per cache key, created on demand.
///
/// Guards are owned, so they can be held across await points while the
/// registry lock itself is only taken briefly to look up the entry.
#[derive(Debug, Default)]
pub struct KeyedMutex {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedMutex {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutex for `key`, waiting if another caller holds it.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if locks.len() > PRUNE_THRESHOLD {
                // An entry only the map references has no holder and no waiter.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of registered keys, pruned or not.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Whether the registry holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let registry = Arc::new(KeyedMutex::new());
        let counter = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let registry = Arc::clone(&registry);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("realtime:counters:orders").await;
                // Read-modify-write with a yield in the middle; without the
                // lock this loses updates.
                let read = counter.load(Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.store(read + 1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("task should not panic");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let registry = KeyedMutex::new();
        let guard_a = registry.acquire("sync:status:a").await;
        // Acquiring a different key must not deadlock while `a` is held.
        let guard_b = registry.acquire("sync:status:b").await;
        drop(guard_a);
        drop(guard_b);
    }

    #[tokio::test]
    async fn test_prune_bounds_registry() {
        let registry = KeyedMutex::new();
        for i in 0..200 {
            let guard = registry.acquire(&format!("realtime:counters:k{i}")).await;
            drop(guard);
        }
        // Pruning keeps the registry near the threshold rather than
        // growing with every key ever touched.
        assert!(registry.len() <= PRUNE_THRESHOLD + 1);
    }
}
