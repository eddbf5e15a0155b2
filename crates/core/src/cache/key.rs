//! Canonical request identity used as the cache key.

use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;

/// Query parameter that forces a refresh. Never part of the key.
pub const BYPASS_PARAM: &str = "reload";

/// Canonical identity of an inbound preview request.
///
/// Built from the caller's own route and query string, not from the upstream
/// target. The bypass parameter is stripped so that a forced refresh writes the
/// same entry a plain request later reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    canonical: String,
    digest: String,
}

impl CacheKey {
    /// Build a key from the pieces of an inbound request line.
    ///
    /// Normalization steps:
    /// 1. Lowercase scheme and host
    /// 2. Drop the fragment
    /// 3. Drop every `reload` query pair, keep the rest in order
    pub fn from_request(scheme: &str, host: &str, path_and_query: &str) -> Result<Self, Error> {
        let raw = format!("{scheme}://{host}{path_and_query}");
        let mut url = Url::parse(&raw).map_err(|e| Error::InvalidInput(format!("invalid request URL {raw}: {e}")))?;
        url.set_fragment(None);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != BYPASS_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }

        Ok(Self::from_canonical(url.to_string()))
    }

    fn from_canonical(canonical: String) -> Self {
        let digest = digest(&canonical);
        Self { canonical, digest }
    }

    /// The normalized request URL.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// SHA-256 hex digest of the canonical URL; the storage key.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
