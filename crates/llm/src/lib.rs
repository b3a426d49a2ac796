//! LLM substrate: structured request/response, rate and token limiting,
//! content-addressed caching, and single-flight dedup.

pub mod cache;
pub mod model_selection;
pub mod openai_client;
pub mod rate_limit;
pub mod single_flight;
pub mod substrate;

pub use cache::{CacheKey, ResponseCache};
pub use rate_limit::{RateLimitSnapshot, RateLimiter};
pub use single_flight::SingleFlight;
pub use substrate::Substrate;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("timeout")]
    Timeout,

    #[error("rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("schema validation failure: {0}")]
    SchemaValidationFailure(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for lexiscribe_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Network(msg) => lexiscribe_core::Error::NetworkFailure(msg),
            LlmError::Timeout => lexiscribe_core::Error::Timeout,
            LlmError::RateLimited { retry_after } => lexiscribe_core::Error::RateLimited { retry_after },
            LlmError::AuthFailure(_) => lexiscribe_core::Error::Unauthorized,
            LlmError::EmptyResponse => lexiscribe_core::Error::UpstreamFailure { service: "llm".to_string() },
            LlmError::SchemaValidationFailure(details) => lexiscribe_core::Error::SchemaValidationFailure { details },
            LlmError::Api(msg) => lexiscribe_core::Error::UpstreamFailure { service: format!("llm: {msg}") },
            LlmError::InvalidResponse(msg) => lexiscribe_core::Error::Internal { cause: msg },
            LlmError::Configuration(msg) => lexiscribe_core::Error::Internal { cause: msg },
        }
    }
}
