//! The configuration tree. Loaded from a base file, then overlaid
//! with environment variables under the `LEXISCRIBE_` prefix, matching the
//! precedence the `config` crate's layered `Config::builder` gives us.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: String,
    pub temperature_default: Option<f32>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
    pub tokens_per_minute: u32,
    pub requests_per_day: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 2000,
            tokens_per_minute: 150_000,
            requests_per_day: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    pub llm_hours: u64,
    pub corpus_names_hours: u64,
    pub corpus_wordlist_hours: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            llm_hours: 24 * 30,
            corpus_names_hours: 6,
            corpus_wordlist_hours: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub heartbeat_seconds: u64,
    pub overall_timeout_seconds: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_seconds: 30,
            overall_timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub lookup_dedup_max_wait_seconds: u64,
    pub provider_fetch_deadline_seconds: u64,
    pub llm_request_deadline_seconds: u64,
    pub db_bulk_deadline_seconds: u64,
    pub lookup_overall_deadline_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookup_dedup_max_wait_seconds: 20,
            provider_fetch_deadline_seconds: 8,
            llm_request_deadline_seconds: 45,
            db_bulk_deadline_seconds: 10,
            lookup_overall_deadline_seconds: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub enabled: Vec<String>,
    #[serde(default = "default_wiktionary_rps")]
    pub wiktionary_requests_per_second: f64,
}

fn default_wiktionary_rps() -> f64 {
    5.0
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["wiktionary".to_string()],
            wiktionary_requests_per_second: default_wiktionary_rps(),
        }
    }
}

/// Bearer-token gate for the HTTP surface. Disabled by default so a local
/// deployment with no configured key still boots; `public_paths` always
/// bypasses the check regardless of `enabled` (health/readiness probes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string(), "/ready".to_string(), "/metrics".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            public_paths: default_public_paths(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub semantic_auto_threshold: usize,
    pub semantic_weight: f32,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            semantic_auto_threshold: 100,
            semantic_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LlmConfig,
    #[serde(default)]
    pub rate: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheTtlConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
}

/// Loads settings from an optional base file plus `LEXISCRIBE_`-prefixed
/// environment variable overrides (nested keys separated by `__`, e.g.
/// `LEXISCRIBE_RATE__REQUESTS_PER_MINUTE=30`).
pub fn load_settings(config_path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if !std::path::Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(path.to_string()));
        }
        builder = builder.add_source(config::File::from(std::path::Path::new(path)));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LEXISCRIBE")
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build()?;
    let settings: Settings = raw.try_deserialize()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.llm.model.trim().is_empty() {
        return Err(ConfigError::MissingField("llm.model".to_string()));
    }
    if settings.llm.api_key.trim().is_empty() {
        return Err(ConfigError::MissingField("llm.api_key".to_string()));
    }
    if settings.providers.enabled.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "providers.enabled".to_string(),
            message: "at least one provider must be enabled".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
            [llm]
            model = "gpt-4o-mini"
            api_key = "test-key"
            "#
        )
        .unwrap();

        let settings = load_settings(Some(file.path().to_str().unwrap())).unwrap();

        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.rate.requests_per_minute, 60);
        assert_eq!(settings.stream.heartbeat_seconds, 30);
    }

    #[test]
    fn rejects_missing_api_key() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
            [llm]
            model = "gpt-4o-mini"
            api_key = ""
            "#
        )
        .unwrap();

        let err = load_settings(Some(file.path().to_str().unwrap())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }
}
