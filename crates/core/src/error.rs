//! Error taxonomy shared by every crate in the workspace.
//!
//! Every fallible operation in the pipeline, substrate, and persistence layers
//! returns `core::Result<T>`. Crate-local error enums (e.g. `llm::LlmError`)
//! convert into `Error` via `From` at the boundary where they cross into
//! shared orchestration code, so call sites never match on foreign error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Language-neutral error taxonomy. Mirrors the shape returned to API
/// clients: `{error, details[], timestamp, request_id}`.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("validation failed: {field}: {message}")]
    ValidationError {
        field: String,
        message: String,
        code: String,
    },

    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("timeout")]
    Timeout,

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("service unavailable: {service}")]
    ServiceUnavailable { service: String },

    #[error("upstream failure: {service}")]
    UpstreamFailure { service: String },

    #[error("schema validation failure: {details}")]
    SchemaValidationFailure { details: String },

    #[error("budget exceeded")]
    BudgetExceeded,

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {cause}")]
    Internal { cause: String },

    #[error("all providers failed for word")]
    AllProvidersFailed,
}

impl Error {
    /// Short label used as the `error` field of the structured API error body.
    pub fn label(&self) -> &'static str {
        match self {
            Error::NotFound => "not_found",
            Error::ValidationError { .. } => "validation_error",
            Error::VersionConflict { .. } => "version_conflict",
            Error::Conflict { .. } => "conflict",
            Error::Unauthorized => "unauthorized",
            Error::Forbidden => "forbidden",
            Error::RateLimited { .. } => "rate_limited",
            Error::Timeout => "timeout",
            Error::NetworkFailure(_) => "network_failure",
            Error::ServiceUnavailable { .. } => "service_unavailable",
            Error::UpstreamFailure { .. } => "upstream_failure",
            Error::SchemaValidationFailure { .. } => "schema_validation_failure",
            Error::BudgetExceeded => "budget_exceeded",
            Error::Cancelled => "cancelled",
            Error::Internal { .. } => "internal",
            Error::AllProvidersFailed => "all_providers_failed",
        }
    }

    /// HTTP status a REST surface should map this onto. The server crate owns
    /// the actual mapping; this is advisory and kept here so every crate
    /// agrees on severity without importing `axum`.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound => 404,
            Error::ValidationError { .. } => 422,
            Error::VersionConflict { .. } => 409,
            Error::Conflict { .. } => 409,
            Error::Unauthorized => 401,
            Error::Forbidden => 403,
            Error::RateLimited { .. } => 429,
            Error::Timeout => 504,
            Error::NetworkFailure(_) => 502,
            Error::ServiceUnavailable { .. } => 503,
            Error::UpstreamFailure { .. } => 502,
            Error::SchemaValidationFailure { .. } => 422,
            Error::BudgetExceeded => 429,
            Error::Cancelled => 499,
            Error::Internal { .. } => 500,
            Error::AllProvidersFailed => 404,
        }
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        Error::Internal { cause: cause.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Error::ValidationError {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Body returned to clients for any failed request, per spec: a short label,
/// structured per-field details, a timestamp, and a request id for log
/// correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: Vec<ErrorDetail>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub field: Option<String>,
    pub message: String,
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn from_error(err: &Error, request_id: impl Into<String>) -> Self {
        let details = match err {
            Error::ValidationError { field, message, code } => vec![ErrorDetail {
                field: Some(field.clone()),
                message: message.clone(),
                code: Some(code.clone()),
            }],
            Error::VersionConflict { expected, actual } => vec![ErrorDetail {
                field: Some("version".to_string()),
                message: format!("expected {expected}, found {actual}"),
                code: Some("version_conflict".to_string()),
            }],
            other => vec![ErrorDetail {
                field: None,
                message: other.to_string(),
                code: None,
            }],
        };

        Self {
            error: err.label().to_string(),
            details,
            timestamp: chrono::Utc::now(),
            request_id: request_id.into(),
        }
    }
}
