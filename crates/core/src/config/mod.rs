//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SRCVIEW_*)
//! 2. TOML config file (if SRCVIEW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which store backs the edge cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local moka cache. Lost on restart.
    #[default]
    Memory,
    /// SQLite file at `db_path`.
    Sqlite,
}

/// How a freshly rendered preview page is written to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// One complete response body.
    #[default]
    Buffered,
    /// A stream of `chunk_size` byte slices.
    Chunked,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SRCVIEW_*)
/// 2. TOML config file (if SRCVIEW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server listens on.
    ///
    /// Set via SRCVIEW_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// User-Agent string for outbound requests.
    ///
    /// Set via SRCVIEW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SRCVIEW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Outbound request timeout in milliseconds.
    ///
    /// Set via SRCVIEW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per fetch.
    ///
    /// Set via SRCVIEW_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Refuse targets that resolve to loopback/private/link-local addresses.
    ///
    /// Set via SRCVIEW_BLOCK_PRIVATE_HOSTS environment variable.
    #[serde(default = "default_true")]
    pub block_private_hosts: bool,

    /// Cache store selection.
    ///
    /// Set via SRCVIEW_CACHE_BACKEND environment variable (`memory` or `sqlite`).
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Path to SQLite cache database (sqlite backend only).
    ///
    /// Set via SRCVIEW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Lifetime of a cached preview in seconds.
    ///
    /// Set via SRCVIEW_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upper bound on cached previews.
    ///
    /// Set via SRCVIEW_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Interval between expired-entry sweeps in seconds.
    ///
    /// Set via SRCVIEW_PURGE_INTERVAL_SECS environment variable.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    /// Syntax used to highlight fetched documents.
    ///
    /// Set via SRCVIEW_LANGUAGE environment variable.
    #[serde(default = "default_language")]
    pub language: String,

    /// Theme for the full preview page.
    ///
    /// Set via SRCVIEW_THEME environment variable.
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Theme for the fragment served to the client app.
    ///
    /// Set via SRCVIEW_FRAGMENT_THEME environment variable.
    #[serde(default = "default_fragment_theme")]
    pub fragment_theme: String,

    /// Delivery mode for fresh preview pages.
    ///
    /// Set via SRCVIEW_DELIVERY environment variable (`buffered` or `chunked`).
    #[serde(default)]
    pub delivery: Delivery,

    /// Slice size for chunked delivery.
    ///
    /// Set via SRCVIEW_CHUNK_SIZE environment variable.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_user_agent() -> String {
    "srcview/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./srcview-cache.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1_000
}

fn default_purge_interval_secs() -> u64 {
    60
}

fn default_language() -> String {
    "html".into()
}

fn default_theme() -> String {
    "base16-ocean.dark".into()
}

fn default_fragment_theme() -> String {
    "InspiredGitHub".into()
}

fn default_chunk_size() -> usize {
    1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            block_private_hosts: true,
            cache_backend: CacheBackend::default(),
            db_path: default_db_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
            purge_interval_secs: default_purge_interval_secs(),
            language: default_language(),
            theme: default_theme(),
            fragment_theme: default_fragment_theme(),
            delivery: Delivery::default(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Interval between cache sweeps.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SRCVIEW_`
    /// 2. TOML file from `SRCVIEW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SRCVIEW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SRCVIEW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8787");
        assert_eq!(config.user_agent, "srcview/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_redirects, 5);
        assert!(config.block_private_hosts);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.language, "html");
        assert_eq!(config.delivery, Delivery::Buffered);
        assert_eq!(config.chunk_size, 1024);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.purge_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SRCVIEW_THEME", "Solarized (dark)");
            jail.set_env("SRCVIEW_DELIVERY", "chunked");
            jail.set_env("SRCVIEW_CACHE_BACKEND", "sqlite");
            jail.set_env("SRCVIEW_CACHE_TTL_SECS", "60");

            let config = AppConfig::load().map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.theme, "Solarized (dark)");
            assert_eq!(config.delivery, Delivery::Chunked);
            assert_eq!(config.cache_backend, CacheBackend::Sqlite);
            assert_eq!(config.cache_ttl_secs, 60);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file_env_wins() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("srcview.toml", "chunk_size = 512\nlanguage = \"xml\"\n")?;
            jail.set_env("SRCVIEW_CONFIG_FILE", "srcview.toml");
            jail.set_env("SRCVIEW_LANGUAGE", "html");

            let config = AppConfig::load().map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.chunk_size, 512);
            assert_eq!(config.language, "html");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SRCVIEW_CHUNK_SIZE", "0");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { field, .. }) if field == "chunk_size"));
            Ok(())
        });
    }
}
