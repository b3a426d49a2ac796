//! The lookup pipeline, enhancement engine, progress tracker, and streaming
//! adapter: the orchestration layer sitting on top of
//! `lexiscribe-core`'s trait seams, `lexiscribe-llm`'s substrate, and
//! `lexiscribe-providers`' clients.

pub mod enhancement;
pub mod llm_tasks;
pub mod lookup;
pub mod progress;
pub mod streaming;
#[cfg(test)]
pub mod test_support;

use std::sync::Arc;

use lexiscribe_core::{
    DefinitionRepository, ExampleRepository, FactRepository, LlmSubstrate, PronunciationRepository,
    ProviderDataRepository, SynthesizedEntryRepository, WordRepository,
};

pub use enhancement::{EnhancementEngine, EnhancementError, EnhancementOutcome};
pub use lookup::{LookupInput, LookupPipeline, PipelineDeadlines};
pub use progress::{PipelineState, ProgressSubscription, ProgressTracker, Stage};
pub use streaming::{project_entry, StreamFrame, StreamingAdapter, StreamingConfig};

/// Every repository trait object the pipeline and enhancement engine need,
/// bundled for cheap cloning across task boundaries (each field is an
/// `Arc`). Distinct from `lexiscribe_persistence::RepositorySet`: this also
/// carries the LLM substrate, since orchestration code depends only on
/// `lexiscribe-core`'s trait seams, never on a concrete backend crate.
#[derive(Clone)]
pub struct Repos {
    pub word: Arc<dyn WordRepository>,
    pub provider_data: Arc<dyn ProviderDataRepository>,
    pub definition: Arc<dyn DefinitionRepository>,
    pub example: Arc<dyn ExampleRepository>,
    pub pronunciation: Arc<dyn PronunciationRepository>,
    pub fact: Arc<dyn FactRepository>,
    pub entry: Arc<dyn SynthesizedEntryRepository>,
    pub llm: Arc<dyn LlmSubstrate>,
}
