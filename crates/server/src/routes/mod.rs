//! HTTP entry layer.
//!
//! - `GET /`: URL form
//! - `GET /preview?url=&reload=`: full highlighted page, edge cached
//! - `GET /api/source?url=`: highlighted fragment only

pub mod form;
pub mod preview;
pub mod source;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::pipeline::Pipeline;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form::form_handler))
        .route("/preview", get(preview::preview_handler))
        .route("/api/source", get(source::source_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
