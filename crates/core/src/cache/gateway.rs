//! The cache seam used by the render pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entries::CacheEntry;
use super::key::CacheKey;
use super::memory::MemoryCache;
use crate::Error;
use crate::config::{AppConfig, CacheBackend};

/// Key-value store for rendered responses.
///
/// Lookups only return entries that are still within their TTL. Stores are
/// idempotent overwrites.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Fetch the fresh entry for `key`, if any.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    /// Store `entry` under `key`, replacing what was there.
    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error>;

    /// Drop expired entries and trim the store to `max_entries`.
    ///
    /// Returns the number of removed entries, when the store can tell.
    async fn purge(&self, _max_entries: usize) -> Result<u64, Error> {
        Ok(0)
    }
}

#[async_trait]
impl CacheGateway for CacheDb {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        self.get_entry(key).await
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error> {
        self.upsert_entry(key, &entry).await
    }

    async fn purge(&self, max_entries: usize) -> Result<u64, Error> {
        let expired = self.purge_expired_entries().await?;
        let evicted = self.purge_lru_entries(max_entries).await?;
        Ok(expired + evicted)
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Ok(self.get(key).await)
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), Error> {
        self.insert(key, entry).await;
        Ok(())
    }

    async fn purge(&self, _max_entries: usize) -> Result<u64, Error> {
        self.run_pending_tasks().await;
        Ok(0)
    }
}

/// Open the store selected by `config.cache_backend`.
pub async fn open_gateway(config: &AppConfig) -> Result<Arc<dyn CacheGateway>, Error> {
    match config.cache_backend {
        CacheBackend::Memory => {
            tracing::info!(capacity = config.cache_max_entries, ttl_secs = config.cache_ttl_secs, "using in-memory cache");
            Ok(Arc::new(MemoryCache::new(config.cache_max_entries as u64, config.cache_ttl())))
        }
        CacheBackend::Sqlite => {
            tracing::info!(path = %config.db_path.display(), "using sqlite cache");
            Ok(Arc::new(CacheDb::open(&config.db_path).await?))
        }
    }
}
