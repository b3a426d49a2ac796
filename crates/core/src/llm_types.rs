//! Types shared between the pipeline/enhancement callers and the `llm`
//! crate's substrate implementation: task tags, model tiers, and the
//! structured request/response envelope.

use serde::{Deserialize, Serialize};

/// Identifies the kind of work an LLM call performs. Maps to a
/// `ModelComplexity` via a fixed table (see `lexiscribe-llm::model_selection`)
/// and doubles as a dimension of the response-cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTag {
    ClusterDefinitions,
    SynthesizeCluster,
    ExtractEtymology,
    GeneratePronunciation,
    GenerateFacts,
    Synonyms,
    Antonyms,
    Examples,
    CefrLevel,
    FrequencyBand,
    Register,
    Domain,
    GrammarPatterns,
    Collocations,
    UsageNotes,
    RegionalVariants,
    WordForms,
}

impl TaskTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskTag::ClusterDefinitions => "cluster_definitions",
            TaskTag::SynthesizeCluster => "synthesize_cluster",
            TaskTag::ExtractEtymology => "extract_etymology",
            TaskTag::GeneratePronunciation => "generate_pronunciation",
            TaskTag::GenerateFacts => "generate_facts",
            TaskTag::Synonyms => "synonyms",
            TaskTag::Antonyms => "antonyms",
            TaskTag::Examples => "examples",
            TaskTag::CefrLevel => "cefr_level",
            TaskTag::FrequencyBand => "frequency_band",
            TaskTag::Register => "register",
            TaskTag::Domain => "domain",
            TaskTag::GrammarPatterns => "grammar_patterns",
            TaskTag::Collocations => "collocations",
            TaskTag::UsageNotes => "usage_notes",
            TaskTag::RegionalVariants => "regional_variants",
            TaskTag::WordForms => "word_forms",
        }
    }

    /// Component-scoped task tags used by the enhancement engine, mapped from
    /// the component being computed.
    pub fn from_component(component: crate::component::Component) -> TaskTag {
        use crate::component::Component as C;
        match component {
            C::Synonyms => TaskTag::Synonyms,
            C::Antonyms => TaskTag::Antonyms,
            C::Examples => TaskTag::Examples,
            C::CefrLevel => TaskTag::CefrLevel,
            C::FrequencyBand => TaskTag::FrequencyBand,
            C::Register => TaskTag::Register,
            C::Domain => TaskTag::Domain,
            C::GrammarPatterns => TaskTag::GrammarPatterns,
            C::Collocations => TaskTag::Collocations,
            C::UsageNotes => TaskTag::UsageNotes,
            C::RegionalVariants => TaskTag::RegionalVariants,
            C::WordForms => TaskTag::WordForms,
            C::Pronunciation => TaskTag::GeneratePronunciation,
            C::Etymology => TaskTag::ExtractEtymology,
            C::Facts => TaskTag::GenerateFacts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// A reasoning-class model: no caller-supplied temperature, larger
    /// internal token budget multiplier.
    Reasoning,
    Capable,
    Fast,
}

/// A structured-output request: a prompt, a caller-supplied JSON Schema the
/// response must conform to, and a task tag driving model/temperature
/// selection and cache/rate-limit bucketing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub task_tag: TaskTag,
    pub prompt: String,
    pub schema: serde_json::Value,
    /// Caller identity for rate-limit bucketing; falls back to source
    /// address at the server boundary if absent.
    pub caller_key: String,
    pub estimated_tokens: u32,
    pub cache_ttl_seconds: Option<u64>,
    /// Per-call override; bypasses the task-tag → complexity table.
    pub model_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub value: serde_json::Value,
    pub usage: TokenUsage,
    pub model: String,
    pub wall_time_ms: u64,
    pub from_cache: bool,
}
