//! Unified error types for srcview.
//!
//! Every variant prints a stable code prefix so log lines can be grepped by
//! failure kind. The HTTP layer maps these onto status codes.

use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Unified error types for the srcview service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed caller input (e.g., no `url` parameter).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The upstream target could not be fetched, or answered with a non-success status.
    #[error("UPSTREAM_FETCH: {0}")]
    UpstreamFetch(String),

    /// The highlighting engine could not be initialized.
    #[error("HIGHLIGHTER_UNAVAILABLE: {0}")]
    HighlighterUnavailable(String),

    /// The highlighting engine failed on a particular document.
    #[error("HIGHLIGHT_FAILED: {0}")]
    HighlightFailed(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Configuration could not be loaded or failed validation.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// The human-readable reason without the code prefix.
    ///
    /// This is what ends up in plain-text error bodies, e.g. `Error: 404 Not Found`.
    pub fn reason(&self) -> String {
        match self {
            Error::InvalidInput(msg)
            | Error::UpstreamFetch(msg)
            | Error::HighlighterUnavailable(msg)
            | Error::HighlightFailed(msg)
            | Error::MigrationFailed(msg)
            | Error::CorruptEntry(msg) => msg.clone(),
            Error::Database(e) => e.to_string(),
            Error::Config(e) => e.to_string(),
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UpstreamFetch("404 Not Found".to_string());
        assert!(err.to_string().starts_with("UPSTREAM_FETCH"));
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[test]
    fn test_reason_strips_code() {
        let err = Error::UpstreamFetch("connection refused".to_string());
        assert_eq!(err.reason(), "connection refused");

        let err = Error::InvalidInput("Missing URL".to_string());
        assert_eq!(err.reason(), "Missing URL");
    }
}
