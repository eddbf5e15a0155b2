//! Process-local edge cache backed by moka.

use std::time::Duration;

use moka::future::Cache;

use super::entries::CacheEntry;
use super::key::CacheKey;

/// In-memory response cache (TinyLFU admission, TTL expiry).
///
/// Cloning is cheap and every clone shares the same store.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, CacheEntry>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries, each for at most `ttl`.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self { inner: Cache::builder().max_capacity(capacity).time_to_live(ttl).build() }
    }

    /// Get a fresh entry by key.
    ///
    /// An entry past its own `expires_at` is dropped and reported as absent.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.inner.get(key.digest()).await?;
        if entry.is_expired() {
            self.inner.invalidate(key.digest()).await;
            return None;
        }
        Some(entry)
    }

    /// Insert an entry, replacing any previous one.
    pub async fn insert(&self, key: &CacheKey, entry: CacheEntry) {
        self.inner.insert(key.digest().to_string(), entry).await;
    }

    /// Returns the number of entries in the cache.
    ///
    /// Approximate until pending maintenance has run.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Run moka's pending eviction work now.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
