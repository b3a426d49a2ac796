//! `DefinitionRepository`. Every write after the initial insert goes through
//! optimistic concurrency since the enhancement engine and the lookup
//! pipeline can race on the same definition.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{Definition, DefinitionId, DefinitionRepository, Result, WordId};

use crate::store::VersionedStore;

pub struct InMemoryDefinitionRepository {
    rows: VersionedStore<DefinitionId, Definition>,
    by_word: DashMap<WordId, Vec<DefinitionId>>,
}

impl InMemoryDefinitionRepository {
    pub fn new() -> Self {
        Self {
            rows: VersionedStore::new(),
            by_word: DashMap::new(),
        }
    }
}

impl Default for InMemoryDefinitionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DefinitionRepository for InMemoryDefinitionRepository {
    async fn find_by_id(&self, id: DefinitionId) -> Result<Option<Definition>> {
        Ok(self.rows.get(&id))
    }

    async fn find_by_ids(&self, ids: &[DefinitionId]) -> Result<Vec<Definition>> {
        Ok(ids.iter().filter_map(|id| self.rows.get(id)).collect())
    }

    async fn find_by_word(&self, word_id: WordId) -> Result<Vec<Definition>> {
        let ids = self.by_word.get(&word_id).map(|r| r.clone()).unwrap_or_default();
        Ok(ids.into_iter().filter_map(|id| self.rows.get(&id)).collect())
    }

    async fn insert(&self, definition: Definition) -> Result<Definition> {
        self.by_word.entry(definition.word_id).or_default().push(definition.id);
        self.rows.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn update(&self, mut definition: Definition, expected_version: u64) -> Result<Definition> {
        definition.updated_at = chrono::Utc::now();
        self.rows.compare_and_update(
            &definition.id,
            expected_version,
            |row| row.version,
            |row| {
                definition.version = expected_version + 1;
                *row = definition.clone();
            },
        )
    }

    async fn delete_by_word(&self, word_id: WordId) -> Result<()> {
        if let Some((_, ids)) = self.by_word.remove(&word_id) {
            for id in ids {
                self.rows.remove(&id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_rejects_stale_version() {
        let repo = InMemoryDefinitionRepository::new();
        let word_id = WordId::new();
        let def = repo.insert(Definition::new(word_id, "noun", "a test", 1)).await.unwrap();

        let mut stale = def.clone();
        stale.synonyms = Some(vec!["trial".to_string()]);
        let err = repo.update(stale, 99).await.unwrap_err();
        assert!(matches!(err, lexiscribe_core::Error::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn update_bumps_version_by_one() {
        let repo = InMemoryDefinitionRepository::new();
        let word_id = WordId::new();
        let def = repo.insert(Definition::new(word_id, "noun", "a test", 1)).await.unwrap();

        let mut updated = def.clone();
        updated.synonyms = Some(vec!["trial".to_string()]);
        let saved = repo.update(updated, def.version).await.unwrap();
        assert_eq!(saved.version, def.version + 1);
    }

    #[tokio::test]
    async fn delete_by_word_clears_index() {
        let repo = InMemoryDefinitionRepository::new();
        let word_id = WordId::new();
        repo.insert(Definition::new(word_id, "noun", "a test", 1)).await.unwrap();
        repo.delete_by_word(word_id).await.unwrap();
        assert!(repo.find_by_word(word_id).await.unwrap().is_empty());
    }
}
