//! A built corpus: the vocabulary plus its precomputed embeddings, and the
//! blended fuzzy/semantic scoring over it.

use chrono::{DateTime, Utc};

use crate::embeddings::{cosine_similarity, EmbeddingConfig, SimpleEmbedder};
use crate::fuzzy;
use lexiscribe_core::SearchHit;

/// Vocabulary entries exceeding this count auto-enable semantic blending
/// when the caller leaves `semantic` unspecified (the "semantic-auto
/// heuristic"). Overridable via `corpus.semantic_auto_threshold`.
pub const DEFAULT_SEMANTIC_AUTO_THRESHOLD: usize = 100;

/// Fixed blend weight between fuzzy and semantic scores, per the explicit
/// "fixed weight" wording (not reciprocal-rank fusion).
pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.5;

pub struct BuiltCorpus {
    pub vocabulary: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    pub built_at: DateTime<Utc>,
}

impl BuiltCorpus {
    pub fn build(vocabulary: Vec<String>) -> Self {
        let embedder = SimpleEmbedder::new(EmbeddingConfig::default());
        let embeddings = vocabulary.iter().map(|entry| embedder.embed(entry)).collect();
        Self {
            vocabulary,
            embeddings,
            built_at: Utc::now(),
        }
    }

    pub fn is_stale(&self, ttl: chrono::Duration) -> bool {
        Utc::now().signed_duration_since(self.built_at) >= ttl
    }

    pub fn search(
        &self,
        query: &str,
        max_results: usize,
        min_score: f32,
        semantic: bool,
        semantic_weight: f32,
    ) -> Vec<SearchHit> {
        let effective_min_score = fuzzy::adaptive_min_score(query, min_score);
        let query_embedding = semantic.then(|| SimpleEmbedder::new(EmbeddingConfig::default()).embed(query));

        let mut hits: Vec<SearchHit> = self
            .vocabulary
            .iter()
            .enumerate()
            .filter_map(|(i, candidate)| {
                let fuzzy_score = fuzzy::similarity(query, candidate);
                let score = match &query_embedding {
                    Some(q) => {
                        let semantic_score = cosine_similarity(q, &self.embeddings[i]).max(0.0);
                        fuzzy_score * (1.0 - semantic_weight) + semantic_score * semantic_weight
                    }
                    None => fuzzy_score,
                };
                (score >= effective_min_score).then(|| SearchHit {
                    text: candidate.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(max_results);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_only_search_ranks_exact_match_first() {
        let corpus = BuiltCorpus::build(vec!["joy".to_string(), "joyful".to_string(), "sorrow".to_string()]);
        let hits = corpus.search("joy", 10, 0.1, false, DEFAULT_SEMANTIC_WEIGHT);
        assert_eq!(hits[0].text, "joy");
    }

    #[test]
    fn min_score_filters_unrelated_entries() {
        let corpus = BuiltCorpus::build(vec!["joy".to_string(), "xylophone".to_string()]);
        let hits = corpus.search("joy", 10, 0.5, false, DEFAULT_SEMANTIC_WEIGHT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "joy");
    }

    #[test]
    fn semantic_blend_still_surfaces_the_exact_match() {
        let corpus = BuiltCorpus::build(vec!["joy".to_string(), "despair".to_string()]);
        let hits = corpus.search("joy", 10, 0.1, true, DEFAULT_SEMANTIC_WEIGHT);
        assert_eq!(hits[0].text, "joy");
    }
}
