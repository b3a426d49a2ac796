//! `Substrate`: the concrete `LlmSubstrate` implementation. Single entry
//! point for every LLM call in the system. Wires together model
//! selection, rate/token limiting, the response cache, single-flight
//! dedup, retries, and schema validation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonschema::JSONSchema;
use lexiscribe_config::LlmConfig;
use lexiscribe_core::{Error, LlmSubstrate, ModelInfo, Result, StructuredRequest, StructuredResponse, TaskTag, TokenUsage};

use crate::cache::{CacheKey, ResponseCache};
use crate::model_selection::{completion_token_budget, model_for_task, temperature_for};
use crate::openai_client::OpenAiClient;
use crate::rate_limit::RateLimiter;
use crate::single_flight::SingleFlight;
use crate::LlmError;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

pub struct Substrate {
    client: OpenAiClient,
    cache: ResponseCache,
    rate_limiter: Arc<RateLimiter>,
    single_flight: Arc<SingleFlight<CacheKey, StructuredResponse>>,
    dedup_max_wait: Duration,
}

impl Substrate {
    pub fn new(config: &LlmConfig, rate_limiter: Arc<RateLimiter>, dedup_max_wait: Duration) -> Result<Self> {
        let client = OpenAiClient::new(
            config.api_base.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
        .map_err(Error::from)?;

        Ok(Self {
            client,
            cache: ResponseCache::new(),
            rate_limiter,
            single_flight: Arc::new(SingleFlight::new()),
            dedup_max_wait,
        })
    }

    /// Exposes the shared rate limiter so the HTTP layer can attach
    /// `X-RateLimit-*` response headers without duplicating bucket
    /// state outside the substrate.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn dispatch(&self, request: &StructuredRequest) -> Result<StructuredResponse> {
        self.rate_limiter.admit(&request.caller_key, request.estimated_tokens)?;

        let (tier, model) = model_for_task(request.task_tag, request.model_override.as_deref());
        let temperature = temperature_for(tier, request.task_tag);
        let max_completion_tokens = completion_token_budget(tier, request.estimated_tokens.max(256));

        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                tracing::warn!(attempt, ?backoff, task = request.task_tag.as_str(), "retrying LLM call");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let start = Instant::now();
            match self
                .client
                .complete_structured(&model, &request.prompt, &request.schema, temperature, max_completion_tokens)
                .await
            {
                Ok(outcome) => {
                    if let Err(err) = validate_schema(&outcome.value, &request.schema) {
                        metrics::counter!("lexiscribe_llm_calls_total", "task_tag" => request.task_tag.as_str(), "outcome" => "schema_invalid").increment(1);
                        return Err(err);
                    }
                    self.rate_limiter.record_actual_tokens(&request.caller_key, outcome.total_tokens);
                    metrics::counter!("lexiscribe_llm_calls_total", "task_tag" => request.task_tag.as_str(), "outcome" => "ok").increment(1);

                    return Ok(StructuredResponse {
                        value: outcome.value,
                        usage: TokenUsage::new(outcome.prompt_tokens, outcome.completion_tokens),
                        model,
                        wall_time_ms: start.elapsed().as_millis() as u64,
                        from_cache: false,
                    });
                }
                Err(LlmError::SchemaValidationFailure(details)) => {
                    metrics::counter!("lexiscribe_llm_calls_total", "task_tag" => request.task_tag.as_str(), "outcome" => "schema_invalid").increment(1);
                    return Err(Error::SchemaValidationFailure { details });
                }
                Err(err) if is_retryable(&err) => {
                    last_error = Some(err);
                }
                Err(err) => {
                    metrics::counter!("lexiscribe_llm_calls_total", "task_tag" => request.task_tag.as_str(), "outcome" => "error").increment(1);
                    return Err(err.into());
                }
            }
        }

        metrics::counter!("lexiscribe_llm_calls_total", "task_tag" => request.task_tag.as_str(), "outcome" => "error").increment(1);
        Err(last_error.map(Error::from).unwrap_or(Error::Timeout))
    }

    /// Produces the `ModelInfo` summary attached to synthesized entries and
    /// facts, derived from a completed structured response.
    pub fn model_info_from(response: &StructuredResponse) -> ModelInfo {
        ModelInfo {
            model: response.model.clone(),
            confidence: Some(0.9),
            prompt_tokens: response.usage.prompt_tokens,
            completion_tokens: response.usage.completion_tokens,
            total_tokens: response.usage.total_tokens,
        }
    }
}

fn is_retryable(err: &LlmError) -> bool {
    matches!(
        err,
        LlmError::Network(_) | LlmError::Timeout | LlmError::RateLimited { retry_after: None }
    )
}

fn validate_schema(value: &serde_json::Value, schema: &serde_json::Value) -> Result<()> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| Error::SchemaValidationFailure { details: e.to_string() })?;

    let result = compiled.validate(value);
    if let Err(errors) = result {
        let details = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
        return Err(Error::SchemaValidationFailure { details });
    }
    Ok(())
}

#[async_trait]
impl LlmSubstrate for Substrate {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<StructuredResponse> {
        let cache_key = CacheKey::new(request.task_tag, &request.prompt, &request.schema);
        if let Some(cached) = self.cache.get(&cache_key) {
            metrics::counter!("lexiscribe_llm_cache_hits_total", "task_tag" => request.task_tag.as_str()).increment(1);
            return Ok(cached);
        }

        let ttl = request
            .cache_ttl_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let single_flight = self.single_flight.clone();
        let dedup_max_wait = self.dedup_max_wait;
        let cache = &self.cache;
        let key_for_cache = cache_key.clone();

        let result = single_flight
            .run(cache_key, dedup_max_wait, || async move { self.dispatch(&request).await })
            .await?;

        cache.put(key_for_cache, result.clone(), ttl);
        Ok(result)
    }
}
