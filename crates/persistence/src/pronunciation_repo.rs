//! `PronunciationRepository`: at most one row per word, enforced by the
//! `upsert` replacing whatever is already indexed for that `word_id`.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{Pronunciation, PronunciationId, PronunciationRepository, Result, WordId};

pub struct InMemoryPronunciationRepository {
    rows: DashMap<PronunciationId, Pronunciation>,
    by_word: DashMap<WordId, PronunciationId>,
}

impl InMemoryPronunciationRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            by_word: DashMap::new(),
        }
    }
}

impl Default for InMemoryPronunciationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PronunciationRepository for InMemoryPronunciationRepository {
    async fn find_by_word(&self, word_id: WordId) -> Result<Option<Pronunciation>> {
        match self.by_word.get(&word_id) {
            Some(id) => Ok(self.rows.get(&*id).map(|r| r.clone())),
            None => Ok(None),
        }
    }

    async fn upsert(&self, mut pronunciation: Pronunciation) -> Result<Pronunciation> {
        if let Some(existing_id) = self.by_word.get(&pronunciation.word_id).map(|r| *r) {
            pronunciation.id = existing_id;
            self.rows.insert(existing_id, pronunciation.clone());
            return Ok(pronunciation);
        }

        self.by_word.insert(pronunciation.word_id, pronunciation.id);
        self.rows.insert(pronunciation.id, pronunciation.clone());
        Ok(pronunciation)
    }

    async fn delete(&self, id: PronunciationId) -> Result<()> {
        if let Some((_, row)) = self.rows.remove(&id) {
            self.by_word.remove(&row.word_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_the_single_row_for_a_word() {
        let repo = InMemoryPronunciationRepository::new();
        let word_id = WordId::new();

        repo.upsert(Pronunciation::new(word_id, "JOY", "/dʒɔɪ/")).await.unwrap();
        repo.upsert(Pronunciation::new(word_id, "joi", "/dʒɔɪ/")).await.unwrap();

        let found = repo.find_by_word(word_id).await.unwrap().unwrap();
        assert_eq!(found.phonetic, "joi");
    }

    #[tokio::test]
    async fn delete_clears_the_word_index() {
        let repo = InMemoryPronunciationRepository::new();
        let word_id = WordId::new();
        let saved = repo.upsert(Pronunciation::new(word_id, "JOY", "/dʒɔɪ/")).await.unwrap();
        repo.delete(saved.id).await.unwrap();
        assert!(repo.find_by_word(word_id).await.unwrap().is_none());
    }
}
