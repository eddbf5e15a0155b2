//! `GET /preview`: full highlighted page, cached.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use serde::Deserialize;

use srcview_core::{CacheKey, Delivery, Error};

use super::AppState;
use crate::error::{ApiError, Route};
use crate::pipeline::{Preview, PreviewRequest, RenderSettings, document};

/// Reports whether the body came from the edge cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Query string of `/preview`.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewParams {
    pub url: Option<String>,
    pub reload: Option<String>,
}

impl PreviewParams {
    /// `reload` forces a refresh when present and non-empty.
    pub fn bypass_cache(&self) -> bool {
        self.reload.as_deref().is_some_and(|v| !v.is_empty())
    }
}

pub async fn preview_handler(
    State(state): State<AppState>, uri: Uri, headers: HeaderMap, Query(params): Query<PreviewParams>,
) -> Result<Response, ApiError> {
    let key = request_key(&uri, &headers)
        .inspect_err(|e| tracing::warn!(error = %e, "no cache key for request; caching skipped"))
        .ok();
    let request = PreviewRequest { bypass_cache: params.bypass_cache(), url: params.url, key };

    let preview = state
        .pipeline
        .preview(request)
        .await
        .map_err(|e| ApiError::new(Route::Preview, e))?;

    Ok(deliver(preview, state.pipeline.settings()))
}

/// Cache identity of the inbound request: its own scheme, host, path and query.
fn request_key(uri: &Uri, headers: &HeaderMap) -> Result<CacheKey, Error> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    let scheme = uri.scheme_str().unwrap_or("http");
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    CacheKey::from_request(scheme, host, path_and_query)
}

/// Turn a preview into a response. Fresh renders honour the delivery mode;
/// cache hits are always sent whole.
fn deliver(preview: Preview, settings: &RenderSettings) -> Response {
    let (entry, chunked, cache_status) = match preview {
        Preview::Cached(entry) => (entry, false, "HIT"),
        Preview::Fresh(entry) => (entry, settings.delivery == Delivery::Chunked, "MISS"),
    };

    let body = if chunked {
        let parts = document::chunks(entry.body, settings.chunk_size).map(Ok::<_, Infallible>);
        Body::from_stream(stream::iter(parts))
    } else {
        Body::from(entry.body)
    };

    (
        [
            (header::CONTENT_TYPE, entry.content_type),
            (header::CACHE_CONTROL, entry.cache_control),
            (X_CACHE, cache_status.to_string()),
        ],
        body,
    )
        .into_response()
}
