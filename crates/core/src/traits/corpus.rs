//! Corpus/search contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

/// A built, queryable index over one vocabulary (the shared "all wordlist
/// names" corpus, or one specific wordlist's words).
#[async_trait]
pub trait CorpusIndex: Send + Sync + 'static {
    /// Builds the corpus if missing, otherwise returns the existing handle.
    /// Concurrent calls for the same `corpus_name` must be single-flighted
    /// onto one build.
    async fn create_or_get(&self, corpus_name: &str, vocabulary: Vec<String>) -> Result<()>;

    /// Fuzzy-matches `query` against `corpus_name`, optionally blended with
    /// vector similarity when `semantic` is `Some(true)`, or decided by the
    /// size heuristic when `None`.
    async fn search(
        &self,
        corpus_name: &str,
        query: &str,
        max_results: usize,
        min_score: f32,
        semantic: Option<bool>,
    ) -> Result<Vec<SearchHit>>;

    /// Explicitly drops a corpus, forcing a rebuild on next `create_or_get`.
    /// Called on wordlist mutation/rename/deletion.
    async fn invalidate(&self, corpus_name: &str) -> Result<()>;
}
