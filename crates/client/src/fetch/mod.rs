//! Outbound fetch of the document to be highlighted.
//!
//! ### Target URL
//! - Absolute http(s) only; fragment dropped
//!
//! ### Safety Gates
//! - Deny private ranges (RFC1918, link-local, localhost, etc.) when enabled
//! - Every DNS answer is checked by the client's resolver, on every hop
//! - Literal private addresses are refused up front and on redirect
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), enforced while streaming
//! - Whole request bounded by a timeout (20s default)
//!
//! No retries: a single failure fails the fetch.

pub mod ssrf;
pub mod url;

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, header, redirect};

pub use self::url::{UrlError, parse_target};
pub use ssrf::{PublicOnlyResolver, SsrfError, check_literal_host, validate_ip};

use srcview_core::{AppConfig, Error};

/// Everything that can go wrong fetching the upstream document.
///
/// The rendered message is what callers see after `Error: ` / `Fetch error: `.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Blocked(#[from] SsrfError),

    /// DNS, connect, TLS, redirect or body read failure, with its causes.
    #[error("network error: {0}")]
    Transport(String),

    /// Upstream answered outside 2xx; displays as e.g. `404 Not Found`.
    #[error("{0}")]
    Status(StatusCode),

    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: usize },

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::UpstreamFetch(err.to_string())
    }
}

/// Retrieves the raw bytes of a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a single GET and return the body of a 2xx response.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "srcview/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Refuse private and reserved addresses (default: true)
    pub block_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "srcview/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            block_private_hosts: true,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            block_private_hosts: config.block_private_hosts,
        }
    }
}

/// HTTP fetch client with safety checks.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

fn redirect_policy(max_redirects: usize, block_private_hosts: bool) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("too many redirects (max {max_redirects})"));
        }
        if block_private_hosts && let Err(e) = check_literal_host(attempt.url()) {
            return attempt.error(e);
        }
        attempt.follow()
    })
}

/// Render a reqwest error with every distinct cause in its source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect_policy(config.max_redirects, config.block_private_hosts))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if config.block_private_hosts {
            builder = builder.dns_resolver(Arc::new(PublicOnlyResolver));
        }
        let http = builder.build().map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    fn transport_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            FetchError::Transport(describe(err))
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    /// Fetch a URL within the redirect, byte and time limits.
    async fn fetch(&self, url_str: &str) -> Result<Bytes, FetchError> {
        let start = Instant::now();
        let url = parse_target(url_str)?;

        if self.config.block_private_hosts {
            check_literal_host(&url)?;
        }

        let mut response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "upstream returned non-success status");
            return Err(FetchError::Status(status));
        }

        let limit = self.config.max_bytes;
        if let Some(len) = response.content_length()
            && len > limit as u64
        {
            return Err(FetchError::TooLarge { size: len, limit });
        }

        let final_url = response.url().clone();
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(&e))? {
            let size = (body.len() + chunk.len()) as u64;
            if size > limit as u64 {
                return Err(FetchError::TooLarge { size, limit });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            url = %url,
            final_url = %final_url,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched upstream document"
        );

        Ok(body.freeze())
    }
}
