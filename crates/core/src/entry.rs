//! `SynthesizedEntry` and `Fact`: the canonical, AI-refined answer returned
//! to clients, plus the model usage metadata attached to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DefinitionId, FactId, ImageId, ProviderDataId, PronunciationId, SynthesizedEntryId, WordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    General,
    Technical,
    Cultural,
    Scientific,
    Etymology,
    Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub confidence: Option<f32>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,
    pub word_id: WordId,
    pub content: String,
    pub category: FactCategory,
    pub model_info: ModelInfo,
    pub created_at: DateTime<Utc>,
}

/// The canonical answer for a headword. At most one per `word_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedEntry {
    pub id: SynthesizedEntryId,
    pub word_id: WordId,
    pub definition_ids: Vec<DefinitionId>,
    pub pronunciation_id: Option<PronunciationId>,
    pub etymology: Option<String>,
    pub fact_ids: Vec<FactId>,
    pub image_ids: Vec<ImageId>,
    pub model_info: ModelInfo,
    pub source_provider_data_ids: Vec<ProviderDataId>,
    pub accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SynthesizedEntry {
    pub fn new(word_id: WordId, model_info: ModelInfo) -> Self {
        let now = Utc::now();
        Self {
            id: SynthesizedEntryId::new(),
            word_id,
            definition_ids: Vec::new(),
            pronunciation_id: None,
            etymology: None,
            fact_ids: Vec::new(),
            image_ids: Vec::new(),
            model_info,
            source_provider_data_ids: Vec::new(),
            accessed_at: now,
            access_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch_access(&mut self) {
        self.accessed_at = Utc::now();
        self.access_count += 1;
    }

    /// Whether the entry is still fresh enough to serve from cache rather
    /// than re-running the pipeline. `ttl` of `None` means "never expires".
    pub fn is_fresh(&self, ttl: Option<chrono::Duration>) -> bool {
        match ttl {
            Some(ttl) => Utc::now().signed_duration_since(self.updated_at) < ttl,
            None => true,
        }
    }
}

/// The wire projection returned to clients for both unary and (unchunked)
/// streaming lookups: the entry plus its hydrated definitions, pronunciation,
/// and facts, rather than bare ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryProjection {
    pub word: String,
    pub id: SynthesizedEntryId,
    pub last_updated: DateTime<Utc>,
    pub model_info: ModelInfo,
    pub pronunciation: Option<crate::definition::Pronunciation>,
    pub etymology: Option<String>,
    pub images: Vec<ImageId>,
    pub definitions: Vec<crate::definition::Definition>,
    pub facts: Vec<Fact>,
}
