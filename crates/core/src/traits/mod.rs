//! Trait seams between crates. Every long-lived dependency (substrate,
//! provider client, repository, corpus index) is injected as a trait object
//! so the pipeline crate never depends on a concrete backend.

pub mod corpus;
pub mod llm;
pub mod provider;
pub mod repository;

pub use corpus::{CorpusIndex, SearchHit};
pub use llm::LlmSubstrate;
pub use provider::ProviderClient;
pub use repository::{
    DefinitionRepository, ExampleRepository, FactRepository, PronunciationRepository,
    ProviderDataRepository, SynthesizedEntryRepository, WordListRepository, WordRepository,
};
