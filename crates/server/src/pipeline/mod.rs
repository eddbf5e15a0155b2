//! Fetch → highlight → cache → deliver.
//!
//! Each stage returns a typed result; the first failure ends the request.
//! Caching is best-effort: lookup failures count as misses and stores run on
//! a tracked background task after the response has been handed back.

pub mod document;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::task::TaskTracker;

use srcview_client::{Fetcher, HighlighterProvider};
use srcview_core::{AppConfig, CacheEntry, CacheGateway, CacheKey, Delivery, Error};

/// Body of a 400 for requests without a target.
pub const MISSING_URL: &str = "Missing URL";

/// Rendering knobs fixed at startup.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub language: String,
    pub theme: String,
    pub fragment_theme: String,
    pub cache_ttl: Duration,
    pub delivery: Delivery,
    pub chunk_size: usize,
}

impl From<&AppConfig> for RenderSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            language: config.language.clone(),
            theme: config.theme.clone(),
            fragment_theme: config.fragment_theme.clone(),
            cache_ttl: config.cache_ttl(),
            delivery: config.delivery,
            chunk_size: config.chunk_size,
        }
    }
}

/// A preview request as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    /// Target to fetch. Absent means the caller forgot it.
    pub url: Option<String>,
    /// Skip the cache read (the write still happens).
    pub bypass_cache: bool,
    /// Identity of the inbound request. Without one the cache is skipped.
    pub key: Option<CacheKey>,
}

/// Successful outcome of a preview.
#[derive(Debug, Clone)]
pub enum Preview {
    /// Served from the edge cache.
    Cached(CacheEntry),
    /// Rendered for this request; the same entry is being stored.
    Fresh(CacheEntry),
}

impl Preview {
    pub fn entry(&self) -> &CacheEntry {
        match self {
            Preview::Cached(entry) | Preview::Fresh(entry) => entry,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Preview::Cached(_))
    }
}

/// Owns the services a render needs.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    highlighter: Arc<dyn HighlighterProvider>,
    cache: Arc<dyn CacheGateway>,
    settings: RenderSettings,
    stores: TaskTracker,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>, highlighter: Arc<dyn HighlighterProvider>, cache: Arc<dyn CacheGateway>,
        settings: RenderSettings,
    ) -> Self {
        Self { fetcher, highlighter, cache, settings, stores: TaskTracker::new() }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Run the full preview: cache check, fetch, highlight, page shell, store.
    pub async fn preview(&self, request: PreviewRequest) -> Result<Preview, Error> {
        let url = require_url(request.url.as_deref())?;

        match &request.key {
            None => {}
            Some(key) if request.bypass_cache => tracing::debug!(key = %key, "cache bypassed"),
            Some(key) => {
                if let Some(entry) = self.lookup(key).await {
                    tracing::debug!(key = %key, "cache hit");
                    return Ok(Preview::Cached(entry));
                }
            }
        }

        let source = self.fetch(url).await?;
        let fragment = self.highlight(source, &self.settings.theme).await?;
        let html = document::page(url, &fragment);

        let entry = CacheEntry::html(html, self.settings.cache_ttl);
        if let Some(key) = request.key {
            self.store_in_background(key, entry.clone());
        }

        Ok(Preview::Fresh(entry))
    }

    /// Fetch and highlight without the page shell or the cache.
    pub async fn fragment(&self, url: Option<&str>) -> Result<String, Error> {
        let url = require_url(url)?;
        let source = self.fetch(url).await?;
        let fragment = self.highlight(source, &self.settings.fragment_theme).await?;
        Ok(document::embed(&fragment))
    }

    /// Build the highlighter now instead of on the first request.
    pub async fn warm_up(&self) -> Result<(), Error> {
        self.highlighter.highlighter().await?;
        Ok(())
    }

    /// Sweep the cache store.
    pub async fn purge_cache(&self, max_entries: usize) -> Result<u64, Error> {
        self.cache.purge(max_entries).await
    }

    /// Wait for every background store spawned so far.
    pub async fn drain_stores(&self) {
        self.stores.close();
        self.stores.wait().await;
        self.stores.reopen();
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.cache.lookup(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, Error> {
        self.fetcher.fetch(url).await.map_err(|e| {
            tracing::debug!(url, error = %e, "upstream fetch failed");
            Error::from(e)
        })
    }

    async fn highlight(&self, source: Bytes, theme: &str) -> Result<String, Error> {
        let highlighter = self.highlighter.highlighter().await?;
        let language = self.settings.language.clone();
        let theme = theme.to_string();

        tokio::task::spawn_blocking(move || {
            let text = String::from_utf8_lossy(&source);
            highlighter.render(&text, &language, &theme)
        })
        .await
        .map_err(|e| Error::HighlightFailed(e.to_string()))?
        .map_err(Error::from)
    }

    fn store_in_background(&self, key: CacheKey, entry: CacheEntry) {
        let cache = self.cache.clone();
        self.stores.spawn(async move {
            match cache.store(&key, entry).await {
                Ok(()) => tracing::debug!(key = %key, "cache stored"),
                Err(e) => tracing::warn!(key = %key, error = %e, "cache store failed"),
            }
        });
    }
}

fn require_url(url: Option<&str>) -> Result<&str, Error> {
    match url {
        Some(u) if !u.is_empty() => Ok(u),
        _ => Err(Error::InvalidInput(MISSING_URL.to_string())),
    }
}
