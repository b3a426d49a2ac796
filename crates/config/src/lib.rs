//! Configuration loading for the dictionary service.
//!
//! Supports loading configuration from:
//! - TOML files
//! - Environment variables (`LEXISCRIBE_` prefix)

pub mod settings;

pub use settings::{
    CacheTtlConfig, CorpusConfig, LlmConfig, PipelineConfig, ProvidersConfig, RateLimitConfig,
    ServerConfig, Settings, StreamConfig, load_settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
