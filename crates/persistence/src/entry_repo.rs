//! `SynthesizedEntryRepository`: at most one entry per word. `insert`
//! enforces that uniqueness; `replace` is the `force_refresh` escape hatch
//! that swaps the row wholesale while still honoring optimistic concurrency.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{Error, Result, SynthesizedEntry, SynthesizedEntryId, SynthesizedEntryRepository, WordId};

use crate::store::VersionedStore;

pub struct InMemorySynthesizedEntryRepository {
    rows: VersionedStore<SynthesizedEntryId, SynthesizedEntry>,
    by_word: DashMap<WordId, SynthesizedEntryId>,
}

impl InMemorySynthesizedEntryRepository {
    pub fn new() -> Self {
        Self {
            rows: VersionedStore::new(),
            by_word: DashMap::new(),
        }
    }
}

impl Default for InMemorySynthesizedEntryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SynthesizedEntryRepository for InMemorySynthesizedEntryRepository {
    async fn find_by_word(&self, word_id: WordId) -> Result<Option<SynthesizedEntry>> {
        match self.by_word.get(&word_id) {
            Some(id) => Ok(self.rows.get(&*id)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: SynthesizedEntryId) -> Result<Option<SynthesizedEntry>> {
        Ok(self.rows.get(&id))
    }

    async fn insert(&self, entry: SynthesizedEntry) -> Result<SynthesizedEntry> {
        if self.by_word.contains_key(&entry.word_id) {
            return Err(Error::Conflict {
                message: format!("synthesized entry already exists for word {}", entry.word_id),
            });
        }
        self.by_word.insert(entry.word_id, entry.id);
        self.rows.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn replace(&self, mut entry: SynthesizedEntry, expected_version: u64) -> Result<SynthesizedEntry> {
        match self.rows.get(&entry.id) {
            Some(existing) if existing.version == expected_version => {
                entry.version = expected_version + 1;
                entry.updated_at = chrono::Utc::now();
                self.by_word.insert(entry.word_id, entry.id);
                self.rows.insert(entry.id, entry.clone());
                Ok(entry)
            }
            Some(existing) => Err(Error::VersionConflict {
                expected: expected_version,
                actual: existing.version,
            }),
            None => {
                entry.version = 0;
                self.by_word.insert(entry.word_id, entry.id);
                self.rows.insert(entry.id, entry.clone());
                Ok(entry)
            }
        }
    }

    async fn update(&self, mut entry: SynthesizedEntry, expected_version: u64) -> Result<SynthesizedEntry> {
        entry.updated_at = chrono::Utc::now();
        self.rows.compare_and_update(
            &entry.id,
            expected_version,
            |row| row.version,
            |row| {
                entry.version = expected_version + 1;
                *row = entry.clone();
            },
        )
    }

    async fn delete_by_word(&self, word_id: WordId) -> Result<()> {
        if let Some((_, id)) = self.by_word.remove(&word_id) {
            self.rows.remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexiscribe_core::ModelInfo;

    fn model_info() -> ModelInfo {
        ModelInfo {
            model: "gpt-4o-mini".to_string(),
            confidence: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
        }
    }

    #[tokio::test]
    async fn insert_rejects_second_entry_for_same_word() {
        let repo = InMemorySynthesizedEntryRepository::new();
        let word_id = WordId::new();
        repo.insert(SynthesizedEntry::new(word_id, model_info())).await.unwrap();

        let err = repo.insert(SynthesizedEntry::new(word_id, model_info())).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn replace_swaps_row_and_bumps_version() {
        let repo = InMemorySynthesizedEntryRepository::new();
        let word_id = WordId::new();
        let first = repo.insert(SynthesizedEntry::new(word_id, model_info())).await.unwrap();

        let second = SynthesizedEntry::new(word_id, model_info());
        let replaced = repo.replace(second, first.version).await.unwrap();
        assert_eq!(replaced.version, first.version + 1);

        let found = repo.find_by_word(word_id).await.unwrap().unwrap();
        assert_eq!(found.id, replaced.id);
    }

    #[tokio::test]
    async fn delete_by_word_removes_the_entry() {
        let repo = InMemorySynthesizedEntryRepository::new();
        let word_id = WordId::new();
        let entry = repo.insert(SynthesizedEntry::new(word_id, model_info())).await.unwrap();

        repo.delete_by_word(word_id).await.unwrap();

        assert!(repo.find_by_word(word_id).await.unwrap().is_none());
        assert!(repo.find_by_id(entry.id).await.unwrap().is_none());
    }
}
