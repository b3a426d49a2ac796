//! In-memory document-store repositories implementing the `core::traits`
//! repository seams, each enforcing optimistic concurrency
//! "Shared-resource policy". A production deployment swaps these for a real
//! document store behind the same traits; the pipeline and server crates
//! never depend on this crate's concrete types directly.

pub mod definition_repo;
pub mod entry_repo;
pub mod example_repo;
pub mod fact_repo;
pub mod pronunciation_repo;
pub mod provider_data_repo;
pub mod store;
pub mod word_repo;
pub mod wordlist_repo;

pub use definition_repo::InMemoryDefinitionRepository;
pub use entry_repo::InMemorySynthesizedEntryRepository;
pub use example_repo::InMemoryExampleRepository;
pub use fact_repo::InMemoryFactRepository;
pub use pronunciation_repo::InMemoryPronunciationRepository;
pub use provider_data_repo::InMemoryProviderDataRepository;
pub use word_repo::InMemoryWordRepository;
pub use wordlist_repo::InMemoryWordListRepository;

use std::sync::Arc;

/// Bundles every in-memory repository behind an `Arc`, wired so
/// `InMemoryWordRepository` can cascade-delete through the others. This is
/// the one concrete type the server crate constructs at startup; everywhere
/// else depends only on the `core::traits` repository interfaces.
#[derive(Clone)]
pub struct RepositorySet {
    pub words: Arc<InMemoryWordRepository>,
    pub provider_data: Arc<InMemoryProviderDataRepository>,
    pub definitions: Arc<InMemoryDefinitionRepository>,
    pub examples: Arc<InMemoryExampleRepository>,
    pub pronunciations: Arc<InMemoryPronunciationRepository>,
    pub facts: Arc<InMemoryFactRepository>,
    pub entries: Arc<InMemorySynthesizedEntryRepository>,
    pub wordlists: Arc<InMemoryWordListRepository>,
}

impl RepositorySet {
    pub fn new() -> Self {
        let provider_data = Arc::new(InMemoryProviderDataRepository::new());
        let definitions = Arc::new(InMemoryDefinitionRepository::new());
        let examples = Arc::new(InMemoryExampleRepository::new());
        let pronunciations = Arc::new(InMemoryPronunciationRepository::new());
        let facts = Arc::new(InMemoryFactRepository::new());
        let entries = Arc::new(InMemorySynthesizedEntryRepository::new());
        let wordlists = Arc::new(InMemoryWordListRepository::new());

        let words = Arc::new(InMemoryWordRepository::new(
            provider_data.clone(),
            definitions.clone(),
            examples.clone(),
            pronunciations.clone(),
            facts.clone(),
            entries.clone(),
        ));

        Self {
            words,
            provider_data,
            definitions,
            examples,
            pronunciations,
            facts,
            entries,
            wordlists,
        }
    }
}

impl Default for RepositorySet {
    fn default() -> Self {
        Self::new()
    }
}
