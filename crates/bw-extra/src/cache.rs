//! Process-wide memoization of provisioning results
//!
//! Each key maps to a cell that is filled at most once. Concurrent first
//! callers for a key queue on the cell, so only one computation runs; the
//! others receive its value. When that computation fails or its caller is
//! dropped, the cell stays empty and the next waiter computes instead.
//! Entries are never evicted.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

/// Single-flight, never-evicting key/value cache
pub struct MemoCache<T> {
    entries: Arc<DashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> MemoCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Value for `key`, running `compute` only if no value was ever stored
    pub async fn cached_call<F, Fut, E>(&self, key: &str, compute: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cell = self.cell(key);
        if let Some(value) = cell.get() {
            debug!("Cache hit for {:?}", key);
            return Ok(value.clone());
        }

        cell.get_or_try_init(|| {
            debug!("Computing {:?}", key);
            compute()
        })
        .await
        .cloned()
    }

    /// Stored value for `key`, without computing anything
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|cell| cell.value().get().cloned())
    }

    /// Number of keys holding a value
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<T>> {
        if let Some(cell) = self.entries.get(key) {
            return Arc::clone(cell.value());
        }
        let entry = self.entries.entry(key.to_string()).or_default();
        Arc::clone(entry.value())
    }
}

impl<T> Default for MemoCache<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

// Clones share the same entries
impl<T> Clone for MemoCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> std::fmt::Debug for MemoCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("keys", &self.entries.len())
            .finish()
    }
}
