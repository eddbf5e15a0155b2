//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::net::SocketAddr;

use crate::config::{AppConfig, CacheBackend};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `bind_addr` is not a socket address
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_redirects` exceeds 20
    /// - `cache_ttl_secs` is 0 or exceeds one day
    /// - `cache_max_entries`, `purge_interval_secs` or `chunk_size` is 0
    /// - `user_agent`, `language`, `theme` or `fragment_theme` is empty
    ///
    /// Returns `ConfigError::Missing` if the sqlite backend is selected without a `db_path`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("bind_addr", "must be a socket address such as 127.0.0.1:8787"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_redirects > 20 {
            return Err(invalid("max_redirects", "must not exceed 20"));
        }

        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }
        if self.cache_ttl_secs > 86_400 {
            return Err(invalid("cache_ttl_secs", "must not exceed one day (86400s)"));
        }
        if self.cache_max_entries == 0 {
            return Err(invalid("cache_max_entries", "must be greater than 0"));
        }
        if self.purge_interval_secs == 0 {
            return Err(invalid("purge_interval_secs", "must be greater than 0"));
        }
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than 0"));
        }

        for (field, value) in [
            ("user_agent", &self.user_agent),
            ("language", &self.language),
            ("theme", &self.theme),
            ("fragment_theme", &self.fragment_theme),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        if self.cache_backend == CacheBackend::Sqlite && self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set SRCVIEW_DB_PATH when SRCVIEW_CACHE_BACKEND=sqlite".into(),
            });
        }

        if self.cache_backend == CacheBackend::Memory && self.db_path != AppConfig::default().db_path {
            tracing::warn!(
                db_path = %self.db_path.display(),
                "db_path is set but cache_backend is memory; the path is ignored"
            );
        }

        Ok(())
    }
}
