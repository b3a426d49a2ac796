//! Shared mocks for pipeline tests: a scripted `LlmSubstrate` that answers
//! every task tag with a minimally valid structured response, and a
//! scripted `ProviderClient`. Kept behind `#[cfg(test)]` in `lib.rs` so it
//! never ships in non-test builds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use lexiscribe_core::{
    LlmSubstrate, ProviderBundle, ProviderClient, ProviderData, ProviderFetchResult, ProviderTag, Result,
    StructuredRequest, StructuredResponse, TaskTag, TokenUsage, WordId,
};

/// Answers every `TaskTag` with a canned, schema-shaped response so the
/// pipeline and enhancement engine can run end to end without a real model.
pub struct ScriptedSubstrate {
    pub calls: AtomicUsize,
}

impl ScriptedSubstrate {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

impl Default for ScriptedSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmSubstrate for ScriptedSubstrate {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<StructuredResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = match request.task_tag {
            TaskTag::ClusterDefinitions => json!({
                "assignments": [
                    { "definition_index": 0, "cluster_id": "c1", "cluster_label": "sense one", "relevance_score": 0.9 }
                ]
            }),
            TaskTag::SynthesizeCluster => json!({ "text": "a synthesized sense", "part_of_speech": "noun" }),
            TaskTag::ExtractEtymology => json!({ "etymology": "from Old English" }),
            TaskTag::GeneratePronunciation => json!({ "phonetic": "JOY", "ipa": "dʒɔɪ" }),
            TaskTag::GenerateFacts => json!({
                "facts": [{ "content": "it rhymes with a lot of words", "category": "general" }]
            }),
            TaskTag::Examples => json!({ "examples": ["a first example", "a second example"] }),
            TaskTag::CefrLevel => json!({ "level": "B1" }),
            TaskTag::FrequencyBand => json!({ "band": 3 }),
            TaskTag::Register | TaskTag::Domain => json!({ "value": "formal" }),
            TaskTag::Synonyms
            | TaskTag::Antonyms
            | TaskTag::GrammarPatterns
            | TaskTag::Collocations
            | TaskTag::UsageNotes
            | TaskTag::RegionalVariants
            | TaskTag::WordForms => json!({ "values": ["one", "two"] }),
        };

        Ok(StructuredResponse {
            value,
            usage: TokenUsage::new(20, 10),
            model: "scripted-model".to_string(),
            wall_time_ms: 1,
            from_cache: false,
        })
    }
}

/// A provider that always returns one definition, one example, and a
/// pronunciation for any word it's asked about.
pub struct StubProvider {
    pub tag: ProviderTag,
}

#[async_trait]
impl ProviderClient for StubProvider {
    fn tag(&self) -> ProviderTag {
        self.tag
    }

    async fn fetch(&self, word: &str, _language: &str) -> Result<ProviderFetchResult> {
        let word_id = WordId::new();
        let mut provider_data = ProviderData::new(word_id, self.tag, json!({ "word": word }));
        provider_data.etymology = Some(format!("said to derive from {word}'s root"));

        let definition = lexiscribe_core::Definition::new(word_id, "noun", format!("a raw sense of {word}"), 1);
        let example =
            lexiscribe_core::Example::new(definition.id, format!("using {word} in a sentence"), lexiscribe_core::ExampleType::Provider);
        let pronunciation = lexiscribe_core::Pronunciation::new(word_id, "stub", "stʌb");

        Ok(ProviderFetchResult::Found(ProviderBundle {
            provider_data,
            definitions: vec![definition],
            examples: vec![example],
            pronunciation: Some(pronunciation),
        }))
    }
}

/// A provider that always fails soft (not found).
pub struct NotFoundProvider;

#[async_trait]
impl ProviderClient for NotFoundProvider {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Custom
    }

    async fn fetch(&self, _word: &str, _language: &str) -> Result<ProviderFetchResult> {
        Ok(ProviderFetchResult::NotFound)
    }
}

/// A provider that always fails hard.
pub struct FailingProvider;

#[async_trait]
impl ProviderClient for FailingProvider {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Oxford
    }

    async fn fetch(&self, _word: &str, _language: &str) -> Result<ProviderFetchResult> {
        Err(lexiscribe_core::Error::UpstreamFailure { service: self.tag().as_str().to_string() })
    }
}

pub fn test_repos() -> crate::Repos {
    test_repos_with_llm(Arc::new(ScriptedSubstrate::new()))
}

pub fn test_repos_with_llm(llm: Arc<dyn LlmSubstrate>) -> crate::Repos {
    let set = lexiscribe_persistence::RepositorySet::new();
    crate::Repos {
        word: set.words.clone(),
        provider_data: set.provider_data.clone(),
        definition: set.definitions.clone(),
        example: set.examples.clone(),
        pronunciation: set.pronunciations.clone(),
        fact: set.facts.clone(),
        entry: set.entries.clone(),
        llm,
    }
}
