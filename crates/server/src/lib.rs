//! Reference HTTP transport for the dictionary service: a minimal Axum
//! surface over the lookup pipeline, enhancement engine, and corpus/search
//! layer.

pub mod auth;
pub mod http;
pub mod metrics;
pub mod state;

pub use auth::auth_middleware;
pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Wraps a `lexiscribe_core::Error` so the HTTP layer can give it an
/// `IntoResponse` impl without core depending on axum: every failed request
/// returns the structured `ErrorBody`.
pub struct ApiError {
    pub error: lexiscribe_core::Error,
    pub request_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = lexiscribe_core::ErrorBody::from_error(&self.error, self.request_id);
        (status, Json(body)).into_response()
    }
}
