//! `WordRepository`: resolves the `(normalized, language)` unique index and
//! cascade-deletes a word's entire owned graph.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{
    DefinitionRepository, ExampleRepository, FactRepository, PronunciationRepository, ProviderDataRepository,
    Result, SynthesizedEntryRepository, Word, WordId, WordRepository,
};

use crate::definition_repo::InMemoryDefinitionRepository;
use crate::entry_repo::InMemorySynthesizedEntryRepository;
use crate::example_repo::InMemoryExampleRepository;
use crate::fact_repo::InMemoryFactRepository;
use crate::pronunciation_repo::InMemoryPronunciationRepository;
use crate::provider_data_repo::InMemoryProviderDataRepository;

pub struct InMemoryWordRepository {
    by_id: DashMap<WordId, Word>,
    by_normalized: DashMap<(String, String), WordId>,
    provider_data: Arc<InMemoryProviderDataRepository>,
    definitions: Arc<InMemoryDefinitionRepository>,
    examples: Arc<InMemoryExampleRepository>,
    pronunciations: Arc<InMemoryPronunciationRepository>,
    facts: Arc<InMemoryFactRepository>,
    entries: Arc<InMemorySynthesizedEntryRepository>,
}

impl InMemoryWordRepository {
    pub fn new(
        provider_data: Arc<InMemoryProviderDataRepository>,
        definitions: Arc<InMemoryDefinitionRepository>,
        examples: Arc<InMemoryExampleRepository>,
        pronunciations: Arc<InMemoryPronunciationRepository>,
        facts: Arc<InMemoryFactRepository>,
        entries: Arc<InMemorySynthesizedEntryRepository>,
    ) -> Self {
        Self {
            by_id: DashMap::new(),
            by_normalized: DashMap::new(),
            provider_data,
            definitions,
            examples,
            pronunciations,
            facts,
            entries,
        }
    }
}

#[async_trait]
impl WordRepository for InMemoryWordRepository {
    async fn find_by_id(&self, id: WordId) -> Result<Option<Word>> {
        Ok(self.by_id.get(&id).map(|r| r.clone()))
    }

    async fn find_by_normalized(&self, normalized: &str, language: &str) -> Result<Option<Word>> {
        let key = (normalized.to_string(), language.to_string());
        match self.by_normalized.get(&key) {
            Some(id) => Ok(self.by_id.get(&*id).map(|r| r.clone())),
            None => Ok(None),
        }
    }

    async fn get_or_create(&self, text: &str, language: &str) -> Result<Word> {
        let normalized = text.trim().to_lowercase();
        let key = (normalized.clone(), language.to_string());

        if let Some(id) = self.by_normalized.get(&key) {
            if let Some(existing) = self.by_id.get(&*id) {
                return Ok(existing.clone());
            }
        }

        let word = Word::new(text, language);
        self.by_id.insert(word.id, word.clone());
        self.by_normalized.insert(key, word.id);
        Ok(word)
    }

    /// Removes the word itself and every row it owns, in an order that
    /// leaves no orphaned secondary index behind even if a later step fails.
    async fn delete_cascade(&self, id: WordId) -> Result<()> {
        self.provider_data.delete_by_word(id).await?;

        let definitions = self.definitions.find_by_word(id).await?;
        for definition in &definitions {
            self.examples.delete_by_definition(definition.id).await?;
        }
        self.definitions.delete_by_word(id).await?;

        if let Some(pronunciation) = self.pronunciations.find_by_word(id).await? {
            self.pronunciations.delete(pronunciation.id).await?;
        }
        self.facts.delete_by_word(id).await?;
        self.entries.delete_by_word(id).await?;

        if let Some(word) = self.by_id.get(&id) {
            let key = (word.normalized.clone(), word.language.clone());
            drop(word);
            self.by_normalized.remove(&key);
        }
        self.by_id.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryWordRepository {
        InMemoryWordRepository::new(
            Arc::new(InMemoryProviderDataRepository::new()),
            Arc::new(InMemoryDefinitionRepository::new()),
            Arc::new(InMemoryExampleRepository::new()),
            Arc::new(InMemoryPronunciationRepository::new()),
            Arc::new(InMemoryFactRepository::new()),
            Arc::new(InMemorySynthesizedEntryRepository::new()),
        )
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_on_normalized_language() {
        let repo = repo();
        let first = repo.get_or_create("Joy", "en").await.unwrap();
        let second = repo.get_or_create("  joy ", "en").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn delete_cascade_removes_word_and_owned_rows() {
        let repo = repo();
        let word = repo.get_or_create("joy", "en").await.unwrap();

        let definition = repo
            .definitions
            .insert(lexiscribe_core::Definition::new(word.id, "noun", "a feeling", 1))
            .await
            .unwrap();
        repo.examples
            .insert_many(vec![lexiscribe_core::Example::new(
                definition.id,
                "pure joy",
                lexiscribe_core::ExampleType::Provider,
            )])
            .await
            .unwrap();
        let entry = repo
            .entries
            .insert(lexiscribe_core::SynthesizedEntry::new(
                word.id,
                lexiscribe_core::ModelInfo {
                    model: "gpt-4o-mini".to_string(),
                    confidence: None,
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    total_tokens: 0,
                },
            ))
            .await
            .unwrap();

        repo.delete_cascade(word.id).await.unwrap();

        assert!(repo.find_by_id(word.id).await.unwrap().is_none());
        assert!(repo.definitions.find_by_word(word.id).await.unwrap().is_empty());
        assert!(repo.examples.find_by_definition(definition.id).await.unwrap().is_empty());
        assert!(repo.entries.find_by_word(word.id).await.unwrap().is_none());
        assert!(repo.entries.find_by_id(entry.id).await.unwrap().is_none());
    }
}
