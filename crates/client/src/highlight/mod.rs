//! Syntax highlighting of fetched documents.
//!
//! The engine (syntect syntax and theme sets) is expensive to build, so it is
//! created once per process behind a single-initialization cell. Concurrent
//! first callers share one build; a failed build is remembered and returned to
//! every later caller instead of being retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use tokio::sync::OnceCell;

use srcview_core::Error;

/// Errors raised while building or using the highlighter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HighlightError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("highlighter initialization failed: {0}")]
    Init(String),

    #[error("highlighting failed: {0}")]
    Render(String),
}

impl From<HighlightError> for Error {
    fn from(err: HighlightError) -> Self {
        match err {
            HighlightError::Render(_) => Error::HighlightFailed(err.to_string()),
            _ => Error::HighlighterUnavailable(err.to_string()),
        }
    }
}

/// A ready highlighter.
pub trait Highlight: Send + Sync {
    /// Render `source` as an HTML fragment with inline style spans.
    fn render(&self, source: &str, language: &str, theme: &str) -> Result<String, HighlightError>;
}

/// Hands out the process-wide highlighter, creating it on first demand.
#[async_trait]
pub trait HighlighterProvider: Send + Sync {
    async fn highlighter(&self) -> Result<Arc<dyn Highlight>, HighlightError>;
}

/// syntect engine bound to a fixed set of languages and themes.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    languages: Vec<String>,
    themes: HashMap<String, Theme>,
}

impl SyntectHighlighter {
    /// Load the bundled syntax and theme sets, keeping only what was asked for.
    ///
    /// Fails if any requested language or theme is not bundled.
    pub fn load(languages: &[String], themes: &[String]) -> Result<Self, HighlightError> {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        for language in languages {
            if syntaxes.find_syntax_by_token(language).is_none() {
                return Err(HighlightError::UnknownLanguage(language.clone()));
            }
        }

        let mut bundled = ThemeSet::load_defaults().themes;
        let mut selected = HashMap::with_capacity(themes.len());
        for name in themes {
            let theme = bundled
                .remove(name)
                .ok_or_else(|| HighlightError::UnknownTheme(name.clone()))?;
            selected.insert(name.clone(), theme);
        }

        Ok(Self { syntaxes, languages: languages.to_vec(), themes: selected })
    }
}

impl Highlight for SyntectHighlighter {
    fn render(&self, source: &str, language: &str, theme: &str) -> Result<String, HighlightError> {
        if !self.languages.iter().any(|l| l == language) {
            return Err(HighlightError::UnknownLanguage(language.to_string()));
        }
        let syntax = self
            .syntaxes
            .find_syntax_by_token(language)
            .ok_or_else(|| HighlightError::UnknownLanguage(language.to_string()))?;
        let theme = self
            .themes
            .get(theme)
            .ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;

        highlighted_html_for_string(source, &self.syntaxes, syntax, theme).map_err(|e| HighlightError::Render(e.to_string()))
    }
}

/// Lazily-built [`SyntectHighlighter`].
pub struct SyntectProvider {
    languages: Vec<String>,
    themes: Vec<String>,
    cell: OnceCell<Result<Arc<SyntectHighlighter>, HighlightError>>,
    inits: AtomicUsize,
}

impl SyntectProvider {
    /// Provider for the given languages and themes. Nothing is loaded yet.
    pub fn new(languages: Vec<String>, mut themes: Vec<String>) -> Self {
        themes.dedup();
        Self { languages, themes, cell: OnceCell::new(), inits: AtomicUsize::new(0) }
    }

    /// How many times the engine build has run. At most 1.
    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::Relaxed)
    }

    async fn build(&self) -> Result<Arc<SyntectHighlighter>, HighlightError> {
        self.inits.fetch_add(1, Ordering::Relaxed);
        let languages = self.languages.clone();
        let themes = self.themes.clone();
        let start = Instant::now();

        let result = tokio::task::spawn_blocking(move || SyntectHighlighter::load(&languages, &themes))
            .await
            .map_err(|e| HighlightError::Init(e.to_string()))
            .and_then(|r| r)
            .map(Arc::new);

        match &result {
            Ok(_) => tracing::info!(
                languages = ?self.languages,
                themes = ?self.themes,
                init_ms = start.elapsed().as_millis() as u64,
                "highlighter ready"
            ),
            Err(e) => tracing::error!(error = %e, "highlighter initialization failed"),
        }
        result
    }
}

#[async_trait]
impl HighlighterProvider for SyntectProvider {
    async fn highlighter(&self) -> Result<Arc<dyn Highlight>, HighlightError> {
        let ready = self.cell.get_or_init(|| self.build()).await;
        match ready {
            Ok(h) => Ok(h.clone() as Arc<dyn Highlight>),
            Err(e) => Err(e.clone()),
        }
    }
}
