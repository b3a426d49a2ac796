//! `ProviderDataRepository`: one row per `(word_id, provider)`. A forced
//! refresh replaces that row in place rather than appending a duplicate
//! during the lookup pipeline's provider fan-out stage.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{ProviderData, ProviderDataId, ProviderDataRepository, ProviderTag, Result, WordId};

use crate::store::VersionedStore;

pub struct InMemoryProviderDataRepository {
    rows: VersionedStore<ProviderDataId, ProviderData>,
    by_word: DashMap<WordId, Vec<ProviderDataId>>,
    by_word_and_provider: DashMap<(WordId, ProviderTag), ProviderDataId>,
}

impl InMemoryProviderDataRepository {
    pub fn new() -> Self {
        Self {
            rows: VersionedStore::new(),
            by_word: DashMap::new(),
            by_word_and_provider: DashMap::new(),
        }
    }
}

impl Default for InMemoryProviderDataRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderDataRepository for InMemoryProviderDataRepository {
    async fn find_by_word(&self, word_id: WordId) -> Result<Vec<ProviderData>> {
        let ids = self.by_word.get(&word_id).map(|r| r.clone()).unwrap_or_default();
        Ok(ids.into_iter().filter_map(|id| self.rows.get(&id)).collect())
    }

    async fn upsert(&self, mut data: ProviderData) -> Result<ProviderData> {
        let key = (data.word_id, data.provider);

        if let Some(existing_id) = self.by_word_and_provider.get(&key).map(|r| *r) {
            data.id = existing_id;
            self.rows.insert(existing_id, data.clone());
            return Ok(data);
        }

        self.by_word_and_provider.insert(key, data.id);
        self.by_word.entry(data.word_id).or_default().push(data.id);
        self.rows.insert(data.id, data.clone());
        Ok(data)
    }

    async fn delete_by_word(&self, word_id: WordId) -> Result<()> {
        if let Some((_, ids)) = self.by_word.remove(&word_id) {
            for id in ids {
                if let Some(row) = self.rows.get(&id) {
                    self.by_word_and_provider.remove(&(row.word_id, row.provider));
                }
                self.rows.remove(&id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_replaces_existing_provider_row_on_refresh() {
        let repo = InMemoryProviderDataRepository::new();
        let word_id = WordId::new();

        let first = ProviderData::new(word_id, ProviderTag::Wiktionary, json!({"v": 1}));
        repo.upsert(first).await.unwrap();

        let second = ProviderData::new(word_id, ProviderTag::Wiktionary, json!({"v": 2}));
        repo.upsert(second).await.unwrap();

        let rows = repo.find_by_word(word_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].raw_data, json!({"v": 2}));
    }

    #[tokio::test]
    async fn delete_by_word_removes_all_provider_rows() {
        let repo = InMemoryProviderDataRepository::new();
        let word_id = WordId::new();
        repo.upsert(ProviderData::new(word_id, ProviderTag::Wiktionary, json!({})))
            .await
            .unwrap();
        repo.upsert(ProviderData::new(word_id, ProviderTag::Apple, json!({})))
            .await
            .unwrap();

        repo.delete_by_word(word_id).await.unwrap();
        assert!(repo.find_by_word(word_id).await.unwrap().is_empty());
    }
}
