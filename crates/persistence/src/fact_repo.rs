//! `FactRepository`. Facts are immutable once generated (no `update`): the
//! word-level synthesis stage regenerates by deleting and re-inserting
//! rather than editing in place.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{Fact, FactId, FactRepository, Result, WordId};

pub struct InMemoryFactRepository {
    rows: DashMap<FactId, Fact>,
    by_word: DashMap<WordId, Vec<FactId>>,
}

impl InMemoryFactRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            by_word: DashMap::new(),
        }
    }
}

impl Default for InMemoryFactRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactRepository for InMemoryFactRepository {
    async fn find_by_ids(&self, ids: &[FactId]) -> Result<Vec<Fact>> {
        Ok(ids.iter().filter_map(|id| self.rows.get(id).map(|r| r.clone())).collect())
    }

    async fn insert_many(&self, facts: Vec<Fact>) -> Result<Vec<Fact>> {
        for fact in &facts {
            self.by_word.entry(fact.word_id).or_default().push(fact.id);
            self.rows.insert(fact.id, fact.clone());
        }
        Ok(facts)
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
    use lexiscribe_core::{FactCategory, ModelInfo};

    fn sample_fact(word_id: WordId) -> Fact {
        Fact {
            id: FactId::new(),
            word_id,
            content: "Joy shares a root with the French joie.".to_string(),
            category: FactCategory::Etymology,
            model_info: ModelInfo {
                model: "gpt-4o-mini".to_string(),
                confidence: Some(0.8),
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_ids() {
        let repo = InMemoryFactRepository::new();
        let word_id = WordId::new();
        let fact = sample_fact(word_id);
        let id = fact.id;
        repo.insert_many(vec![fact]).await.unwrap();

        let found = repo.find_by_ids(&[id]).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn delete_by_word_removes_all_facts() {
        let repo = InMemoryFactRepository::new();
        let word_id = WordId::new();
        repo.insert_many(vec![sample_fact(word_id)]).await.unwrap();
        repo.delete_by_word(word_id).await.unwrap();

        let remaining = repo.by_word.get(&word_id);
        assert!(remaining.is_none());
    }
}
