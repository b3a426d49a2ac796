//! `Word` and `ProviderData`: the raw, per-provider half of the data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DefinitionId, ProviderDataId, PronunciationId, WordId};

/// A canonical headword. `(normalized, language)` is unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub text: String,
    pub normalized: String,
    pub language: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Word {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        let text = text.into();
        let normalized = text.trim().to_lowercase();
        let now = Utc::now();
        Self {
            id: WordId::new(),
            text,
            normalized,
            language: language.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tags the upstream dictionary a definition or pronunciation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTag {
    Wiktionary,
    Apple,
    Oxford,
    Merriam,
    Custom,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::Wiktionary => "wiktionary",
            ProviderTag::Apple => "apple",
            ProviderTag::Oxford => "oxford",
            ProviderTag::Merriam => "merriam",
            ProviderTag::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw per-provider fetch result, normalized to the internal shape but still
/// carrying the original payload for re-normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderData {
    pub id: ProviderDataId,
    pub word_id: WordId,
    pub provider: ProviderTag,
    pub definition_ids: Vec<DefinitionId>,
    pub pronunciation_id: Option<PronunciationId>,
    pub etymology: Option<String>,
    /// Compact encoding of the original provider payload, retained so the
    /// entry synthesizer can re-normalize without refetching.
    pub raw_data: serde_json::Value,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderData {
    pub fn new(word_id: WordId, provider: ProviderTag, raw_data: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: ProviderDataId::new(),
            word_id,
            provider,
            definition_ids: Vec::new(),
            pronunciation_id: None,
            etymology: None,
            raw_data,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a provider's `fetch` call returns: either the normalized bundle or a
/// soft not-found signal. Providers never return a hard error for "no entry";
/// only for transport/auth failures does `fetch` return `core::Error`.
#[derive(Debug, Clone)]
pub enum ProviderFetchResult {
    Found(ProviderBundle),
    NotFound,
}

/// A provider's normalized output: the `ProviderData` row plus any
/// `Definition`s, `Example`s, and a `Pronunciation` already present in the
/// source payload (most providers ship these inline).
#[derive(Debug, Clone)]
pub struct ProviderBundle {
    pub provider_data: ProviderData,
    pub definitions: Vec<crate::definition::Definition>,
    pub examples: Vec<crate::definition::Example>,
    pub pronunciation: Option<crate::definition::Pronunciation>,
}
