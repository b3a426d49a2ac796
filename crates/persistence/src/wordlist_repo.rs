//! `WordListRepository`. A `WordList` only references `Word`/`Definition`
//! ids; it does not own them, so deleting one never cascades into the
//! Word/Definition graph, and dangling references left behind by a deleted
//! word are tolerated.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{Result, WordList, WordListId, WordListRepository};

use crate::store::VersionedStore;

pub struct InMemoryWordListRepository {
    rows: VersionedStore<WordListId, WordList>,
    by_owner: DashMap<String, Vec<WordListId>>,
}

impl InMemoryWordListRepository {
    pub fn new() -> Self {
        Self {
            rows: VersionedStore::new(),
            by_owner: DashMap::new(),
        }
    }
}

impl Default for InMemoryWordListRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WordListRepository for InMemoryWordListRepository {
    async fn find_by_id(&self, id: WordListId) -> Result<Option<WordList>> {
        Ok(self.rows.get(&id))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<WordList>> {
        let ids = self.by_owner.get(owner_id).map(|r| r.clone()).unwrap_or_default();
        Ok(ids.into_iter().filter_map(|id| self.rows.get(&id)).collect())
    }

    async fn insert(&self, list: WordList) -> Result<WordList> {
        self.by_owner.entry(list.owner_id.clone()).or_default().push(list.id);
        self.rows.insert(list.id, list.clone());
        Ok(list)
    }

    async fn update(&self, mut list: WordList, expected_version: u64) -> Result<WordList> {
        list.updated_at = chrono::Utc::now();
        self.rows.compare_and_update(
            &list.id,
            expected_version,
            |row| row.version,
            |row| {
                list.version = expected_version + 1;
                *row = list.clone();
            },
        )
    }

    async fn delete(&self, id: WordListId) -> Result<()> {
        if let Some(list) = self.rows.get(&id) {
            if let Some(mut owned) = self.by_owner.get_mut(&list.owner_id) {
                owned.retain(|existing| *existing != id);
            }
        }
        self.rows.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_rejects_stale_version() {
        let repo = InMemoryWordListRepository::new();
        let list = repo.insert(WordList::new("favorites", "user-1")).await.unwrap();

        let mut stale = list.clone();
        stale.name = "renamed".to_string();
        let err = repo.update(stale, 5).await.unwrap_err();
        assert!(matches!(err, lexiscribe_core::Error::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn delete_removes_from_owner_index() {
        let repo = InMemoryWordListRepository::new();
        let list = repo.insert(WordList::new("favorites", "user-1")).await.unwrap();
        repo.delete(list.id).await.unwrap();

        assert!(repo.find_by_owner("user-1").await.unwrap().is_empty());
        assert!(repo.find_by_id(list.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tolerates_dangling_word_references_on_delete() {
        use lexiscribe_core::WordListItem;
        let repo = InMemoryWordListRepository::new();
        let mut list = WordList::new("favorites", "user-1");
        list.words.push(WordListItem::new(lexiscribe_core::WordId::new()));
        list.recompute_hash();
        let saved = repo.insert(list).await.unwrap();

        // Deleting the referenced word happens in WordRepository and never
        // touches this list; the dangling WordId is left as-is.
        assert_eq!(repo.find_by_id(saved.id).await.unwrap().unwrap().words.len(), 1);
    }
}
