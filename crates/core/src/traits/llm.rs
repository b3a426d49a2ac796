//! The LLM substrate trait: the single entry point every orchestration
//! component uses to call out to the model provider.

use async_trait::async_trait;

use crate::llm_types::{StructuredRequest, StructuredResponse};
use crate::Result;

/// Implemented by `lexiscribe-llm::Substrate`. Kept as a trait so the
/// pipeline and enhancement engine depend only on `lexiscribe-core`, not on
/// the concrete substrate, and so tests can supply a mock.
#[async_trait]
pub trait LlmSubstrate: Send + Sync + 'static {
    /// Dispatches a structured-output request: selects model/temperature/token
    /// budget from the task tag, enforces rate/token limits, checks the
    /// response cache, coalesces in-flight duplicates, retries transient
    /// failures, and validates the result against `request.schema` before
    /// returning it.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<StructuredResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_types::{TaskTag, TokenUsage};

    struct EchoSubstrate;

    #[async_trait]
    impl LlmSubstrate for EchoSubstrate {
        async fn complete_structured(&self, request: StructuredRequest) -> Result<StructuredResponse> {
            Ok(StructuredResponse {
                value: serde_json::json!({ "echo": request.prompt }),
                usage: TokenUsage::new(10, 5),
                model: "echo".to_string(),
                wall_time_ms: 0,
                from_cache: false,
            })
        }
    }

    #[tokio::test]
    async fn echo_substrate_round_trips_prompt() {
        let substrate = EchoSubstrate;
        let response = substrate
            .complete_structured(StructuredRequest {
                task_tag: TaskTag::Synonyms,
                prompt: "hello".to_string(),
                schema: serde_json::json!({"type": "object"}),
                caller_key: "test".to_string(),
                estimated_tokens: 10,
                cache_ttl_seconds: None,
                model_override: None,
            })
            .await
            .unwrap();
        assert_eq!(response.value["echo"], "hello");
    }
}
