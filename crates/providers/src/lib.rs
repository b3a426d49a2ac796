//! Dictionary provider clients. Each provider fetches raw data
//! for one headword and normalizes it to the internal `ProviderData` /
//! `Definition` / `Example` / `Pronunciation` shape. A provider that cannot
//! be reached fails soft: the pipeline treats any error the same as
//! `NotFound` unless every configured provider fails for the word.

pub mod apple;
pub mod registry;
pub mod token_bucket;
pub mod wiktionary;

pub use registry::ProviderRegistry;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("not found")]
    NotFound,

    #[error("network failure: {0}")]
    Network(String),

    #[error("unexpected response shape: {0}")]
    MalformedResponse(String),

    #[error("provider unavailable in this deployment")]
    Unavailable,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

impl From<ProviderError> for lexiscribe_core::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound => lexiscribe_core::Error::NotFound,
            ProviderError::Network(msg) => lexiscribe_core::Error::NetworkFailure(msg),
            ProviderError::MalformedResponse(msg) => lexiscribe_core::Error::UpstreamFailure { service: msg },
            ProviderError::Unavailable => lexiscribe_core::Error::ServiceUnavailable { service: "provider".to_string() },
        }
    }
}
