//! HTTP mapping of pipeline errors.
//!
//! All errors become plain-text bodies:
//! - missing input: 400 with the reason (`Missing URL`)
//! - upstream fetch failure: 502 with a route-specific prefix
//! - anything else: 500

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use srcview_core::Error;

/// Route that produced an error. Picks the 502 body prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/preview`: `Error: <reason>`
    Preview,
    /// `/api/source`: `Fetch error: <reason>`
    Source,
}

impl Route {
    fn upstream_prefix(self) -> &'static str {
        match self {
            Route::Preview => "Error: ",
            Route::Source => "Fetch error: ",
        }
    }
}

/// A pipeline error bound to the route that surfaced it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ApiError {
    route: Route,
    #[source]
    error: Error,
}

impl ApiError {
    pub fn new(route: Route, error: Error) -> Self {
        Self { route, error }
    }

    pub fn status(&self) -> StatusCode {
        match &self.error {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> String {
        match &self.error {
            Error::InvalidInput(msg) => msg.clone(),
            Error::UpstreamFetch(msg) => format!("{}{msg}", self.route.upstream_prefix()),
            other => format!("Error: {}", other.reason()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self.error {
                Error::UpstreamFetch(_) => tracing::warn!(route = ?self.route, error = %self.error, "upstream failure"),
                _ => tracing::error!(route = ?self.route, error = %self.error, "request failed"),
            }
        }
        (status, self.body()).into_response()
    }
}
