//! Get-or-fetch asset cache
//!
//! An injectable replacement for ad hoc module-level caches of fetched
//! assets (artwork bytes, cover metadata). Callers own the instance and
//! pass it where it is needed; there are no global singletons.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;

/// In-memory cache keyed by URL (or any string key)
///
/// `get_or_fetch` is double-checked: if another task populated the key
/// while the fetch was in flight, the already-cached value wins so every
/// reader observes one canonical value per key.
#[derive(Debug, Default)]
pub struct AssetCache<V> {
    entries: Mutex<HashMap<String, V>>,
}

impl<V: Clone> AssetCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached value
    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Return the cached value, fetching and caching it on a miss
    ///
    /// The fetcher runs outside the lock; a fetch error is returned to the
    /// caller and nothing is cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let fetched = fetch().await?;

        let mut entries = self.entries.lock().await;
        Ok(entries
            .entry(key.to_string())
            .or_insert(fetched)
            .clone())
    }

    /// Drop a single entry
    pub async fn invalidate(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
