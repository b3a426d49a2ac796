//! `ExampleRepository`. Examples are owned by their `Definition` and never
//! carry a version: the enhancement engine replaces a definition's example
//! set wholesale rather than editing rows in place.

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{DefinitionId, Example, ExampleId, ExampleRepository, Result};

pub struct InMemoryExampleRepository {
    rows: DashMap<ExampleId, Example>,
    by_definition: DashMap<DefinitionId, Vec<ExampleId>>,
}

impl InMemoryExampleRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            by_definition: DashMap::new(),
        }
    }
}

impl Default for InMemoryExampleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExampleRepository for InMemoryExampleRepository {
    async fn find_by_definition(&self, definition_id: DefinitionId) -> Result<Vec<Example>> {
        let ids = self.by_definition.get(&definition_id).map(|r| r.clone()).unwrap_or_default();
        Ok(ids.into_iter().filter_map(|id| self.rows.get(&id).map(|r| r.clone())).collect())
    }

    async fn insert_many(&self, examples: Vec<Example>) -> Result<Vec<Example>> {
        for example in &examples {
            self.by_definition.entry(example.definition_id).or_default().push(example.id);
            self.rows.insert(example.id, example.clone());
        }
        Ok(examples)
    }

    async fn delete_by_definition(&self, definition_id: DefinitionId) -> Result<()> {
        if let Some((_, ids)) = self.by_definition.remove(&definition_id) {
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
    use lexiscribe_core::ExampleType;

    #[tokio::test]
    async fn insert_many_then_find_by_definition() {
        let repo = InMemoryExampleRepository::new();
        let definition_id = DefinitionId::new();
        let examples = vec![
            Example::new(definition_id, "first", ExampleType::Provider),
            Example::new(definition_id, "second", ExampleType::Generated),
        ];
        repo.insert_many(examples).await.unwrap();

        let found = repo.find_by_definition(definition_id).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn delete_by_definition_removes_all_examples() {
        let repo = InMemoryExampleRepository::new();
        let definition_id = DefinitionId::new();
        repo.insert_many(vec![Example::new(definition_id, "x", ExampleType::Provider)])
            .await
            .unwrap();
        repo.delete_by_definition(definition_id).await.unwrap();
        assert!(repo.find_by_definition(definition_id).await.unwrap().is_empty());
    }
}
