//! `CorpusIndex` implementation: TTL-cached, single-flight-built per-name
//! corpora. Corpus indexes are shared; builds are single-flight keyed by
//! corpus name.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use lexiscribe_core::{CorpusIndex, Result, SearchHit};
use lexiscribe_llm::SingleFlight;

use crate::semantic::{BuiltCorpus, DEFAULT_SEMANTIC_AUTO_THRESHOLD, DEFAULT_SEMANTIC_WEIGHT};

/// How long before a build is eligible for single-flight wait before a
/// caller falls back to running its own build independently (the general
/// single-flight contract, applied here to corpus construction).
const BUILD_MAX_WAIT: Duration = Duration::from_secs(10);

pub struct CorpusRegistry {
    corpora: DashMap<String, Arc<BuiltCorpus>>,
    build_single_flight: SingleFlight<String, Arc<BuiltCorpus>>,
    ttl: chrono::Duration,
    semantic_auto_threshold: usize,
    semantic_weight: f32,
}

impl CorpusRegistry {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            corpora: DashMap::new(),
            build_single_flight: SingleFlight::new(),
            ttl,
            semantic_auto_threshold: DEFAULT_SEMANTIC_AUTO_THRESHOLD,
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
        }
    }

    pub fn with_semantic_params(mut self, auto_threshold: usize, weight: f32) -> Self {
        self.semantic_auto_threshold = auto_threshold;
        self.semantic_weight = weight;
        self
    }
}

#[async_trait]
impl CorpusIndex for CorpusRegistry {
    async fn create_or_get(&self, corpus_name: &str, vocabulary: Vec<String>) -> Result<()> {
        if let Some(existing) = self.corpora.get(corpus_name) {
            if !existing.is_stale(self.ttl) {
                return Ok(());
            }
        }

        let name = corpus_name.to_string();
        let built = self
            .build_single_flight
            .run(name.clone(), BUILD_MAX_WAIT, || async move {
                tracing::debug!(corpus = %name, size = vocabulary.len(), "building corpus");
                metrics::counter!("lexiscribe_corpus_builds_total").increment(1);
                Ok(Arc::new(BuiltCorpus::build(vocabulary)))
            })
            .await?;

        self.corpora.insert(corpus_name.to_string(), built);
        Ok(())
    }

    async fn search(
        &self,
        corpus_name: &str,
        query: &str,
        max_results: usize,
        min_score: f32,
        semantic: Option<bool>,
    ) -> Result<Vec<SearchHit>> {
        let Some(corpus) = self.corpora.get(corpus_name) else {
            return Ok(Vec::new());
        };

        let semantic_enabled = semantic.unwrap_or_else(|| corpus.vocabulary.len() > self.semantic_auto_threshold);
        Ok(corpus.search(query, max_results, min_score, semantic_enabled, self.semantic_weight))
    }

    async fn invalidate(&self, corpus_name: &str) -> Result<()> {
        self.corpora.remove(corpus_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_or_get_is_idempotent_until_invalidated() {
        let registry = CorpusRegistry::new(chrono::Duration::hours(1));
        registry
            .create_or_get("wordlist-1", vec!["joy".to_string(), "sorrow".to_string()])
            .await
            .unwrap();

        let hits = registry.search("wordlist-1", "joy", 10, 0.1, Some(false)).await.unwrap();
        assert_eq!(hits[0].text, "joy");

        registry.invalidate("wordlist-1").await.unwrap();
        let hits = registry.search("wordlist-1", "joy", 10, 0.1, Some(false)).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn semantic_auto_enables_above_threshold() {
        let registry = CorpusRegistry::new(chrono::Duration::hours(1)).with_semantic_params(2, 0.5);
        registry
            .create_or_get("names", vec!["joy".to_string(), "sorrow".to_string(), "rage".to_string()])
            .await
            .unwrap();

        // With semantic left unspecified and vocabulary above the threshold,
        // the search still returns the exact match first regardless of
        // whether the blend engaged.
        let hits = registry.search("names", "joy", 10, 0.1, None).await.unwrap();
        assert_eq!(hits[0].text, "joy");
    }

    #[tokio::test]
    async fn search_against_unbuilt_corpus_returns_empty() {
        let registry = CorpusRegistry::new(chrono::Duration::hours(1));
        let hits = registry.search("missing", "joy", 10, 0.1, Some(false)).await.unwrap();
        assert!(hits.is_empty());
    }
}
