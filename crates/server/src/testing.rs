//! In-memory stand-ins for the pipeline's services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use srcview_client::{FetchError, Fetcher, Highlight, HighlightError, HighlighterProvider};
use srcview_core::{AppConfig, CacheEntry, CacheGateway, CacheKey, Error};

use crate::pipeline::document::html_escape;
use crate::pipeline::{Pipeline, RenderSettings};

/// Fetcher that answers every URL with the same canned result.
pub struct FakeFetcher {
    calls: AtomicUsize,
    result: Mutex<Result<String, String>>,
}

impl FakeFetcher {
    pub fn ok(body: &str) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), result: Mutex::new(Ok(body.to_string())) })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), result: Mutex::new(Err(reason.to_string())) })
    }

    pub fn set_body(&self, body: &str) {
        *self.result.lock().unwrap() = Ok(body.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.result.lock().unwrap().clone();
        result.map(Bytes::from).map_err(FetchError::Transport)
    }
}

/// Highlighter that escapes the source into a `<pre>` tagged with the theme.
pub struct FakeHighlighter {
    broken: bool,
}

impl FakeHighlighter {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self { broken: false })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self { broken: true })
    }
}

struct EscapingHighlight;

impl Highlight for EscapingHighlight {
    fn render(&self, source: &str, _language: &str, theme: &str) -> Result<String, HighlightError> {
        Ok(format!("<pre data-theme=\"{theme}\">{}</pre>", html_escape(source)))
    }
}

#[async_trait]
impl HighlighterProvider for FakeHighlighter {
    async fn highlighter(&self) -> Result<Arc<dyn Highlight>, HighlightError> {
        if self.broken {
            return Err(HighlightError::UnknownTheme("missing-theme".into()));
        }
        Ok(Arc::new(EscapingHighlight))
    }
}

/// Cache whose every operation fails.
pub struct FailingCache;

#[async_trait]
impl CacheGateway for FailingCache {
    async fn lookup(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Err(Error::CorruptEntry("lookup unavailable".into()))
    }

    async fn store(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<(), Error> {
        Err(Error::CorruptEntry("store unavailable".into()))
    }
}

pub fn pipeline_with(
    fetcher: Arc<FakeFetcher>, highlighter: Arc<FakeHighlighter>, cache: Arc<dyn CacheGateway>,
) -> Pipeline {
    pipeline_with_config(fetcher, highlighter, cache, &AppConfig::default())
}

pub fn pipeline_with_config(
    fetcher: Arc<FakeFetcher>, highlighter: Arc<FakeHighlighter>, cache: Arc<dyn CacheGateway>, config: &AppConfig,
) -> Pipeline {
    Pipeline::new(fetcher, highlighter, cache, RenderSettings::from(config))
}
