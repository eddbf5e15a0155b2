//! `GET /api/source`: highlighted fragment for a client-owned page.

use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use super::AppState;
use crate::error::{ApiError, Route};

/// Query string of `/api/source`.
#[derive(Debug, Default, Deserialize)]
pub struct SourceParams {
    pub url: Option<String>,
}

pub async fn source_handler(
    State(state): State<AppState>, Query(params): Query<SourceParams>,
) -> Result<Html<String>, ApiError> {
    state
        .pipeline
        .fragment(params.url.as_deref())
        .await
        .map(Html)
        .map_err(|e| ApiError::new(Route::Source, e))
}
