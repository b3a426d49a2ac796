//! Authentication Middleware
//!
//! Bearer-token gate for the HTTP API, configured via `server.auth`. Public paths
//! (health/readiness/metrics by default) always bypass the check.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Tracks whether we've already warned about auth being disabled (warn once).
static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

enum AuthCheck {
    Disabled,
    PublicPath,
    ConfigError(&'static str),
    CheckKey(String),
}

fn check_auth_config(state: &AppState, path: &str) -> AuthCheck {
    let auth_config = &state.settings.server.auth;

    if !auth_config.enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!("API authentication is DISABLED; set LEXISCRIBE__SERVER__AUTH__ENABLED=true for production");
        }
        return AuthCheck::Disabled;
    }

    if auth_config.public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return AuthCheck::PublicPath;
    }

    if auth_config.api_key.trim().is_empty() {
        AuthCheck::ConfigError("auth is enabled but no API key is configured")
    } else {
        AuthCheck::CheckKey(auth_config.api_key.clone())
    }
}

/// Checks `Authorization: Bearer <api_key>` against the configured key.
/// Returns 401 if auth is enabled and the key is missing or wrong, 500 if
/// auth is enabled with no key configured at all.
pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let auth_check = check_auth_config(&state, &path);

    match auth_check {
        AuthCheck::Disabled | AuthCheck::PublicPath => next.run(request).await,
        AuthCheck::ConfigError(msg) => {
            tracing::error!("{}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "server authentication not configured").into_response()
        }
        AuthCheck::CheckKey(expected_key) => {
            let auth_header =
                request.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);

            match auth_header {
                Some(header) if header.starts_with("Bearer ") => {
                    let provided_key = &header[7..];
                    if constant_time_compare(provided_key.as_bytes(), expected_key.as_bytes()) {
                        next.run(request).await
                    } else {
                        tracing::warn!("invalid API key provided");
                        (StatusCode::UNAUTHORIZED, "invalid API key").into_response()
                    }
                }
                Some(_) => {
                    (StatusCode::BAD_REQUEST, "invalid Authorization header format, expected: Bearer <token>")
                        .into_response()
                }
                None => (StatusCode::UNAUTHORIZED, "missing Authorization header").into_response(),
            }
        }
    }
}

/// Constant-time comparison to avoid timing attacks on the API key check.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_compare_matches_equal_strings() {
        assert!(constant_time_compare(b"secret", b"secret"));
        assert!(!constant_time_compare(b"secret", b"secre"));
        assert!(!constant_time_compare(b"secret", b"secreT"));
        assert!(!constant_time_compare(b"abc", b"xyz"));
    }
}
