//! Core domain types, error taxonomy, and trait seams shared by every crate
//! in the workspace:
//! - the Word/Definition/Example/Pronunciation/SynthesizedEntry/Fact/WordList
//!   data model
//! - the language-neutral error taxonomy
//! - LLM substrate, provider client, repository, and corpus traits that
//!   downstream crates implement and the pipeline crate depends on

pub mod component;
pub mod definition;
pub mod entry;
pub mod error;
pub mod ids;
pub mod llm_types;
pub mod traits;
pub mod word;
pub mod wordlist;

pub use component::{parse_components, Component};
pub use definition::{CefrLevel, Definition, Example, ExampleType, MeaningCluster, Pronunciation, Transitivity};
pub use entry::{EntryProjection, Fact, FactCategory, ModelInfo, SynthesizedEntry};
pub use error::{Error, ErrorBody, ErrorDetail, Result};
pub use ids::{
    AudioFileId, DefinitionId, ExampleId, FactId, ImageId, ProviderDataId, PronunciationId,
    SynthesizedEntryId, WordId, WordListId,
};
pub use llm_types::{ModelComplexity, ModelTier, StructuredRequest, StructuredResponse, TaskTag, TokenUsage};
pub use traits::{
    CorpusIndex, DefinitionRepository, ExampleRepository, FactRepository, LlmSubstrate,
    PronunciationRepository, ProviderClient, ProviderDataRepository, SearchHit,
    SynthesizedEntryRepository, WordListRepository, WordRepository,
};
pub use word::{ProviderBundle, ProviderData, ProviderFetchResult, ProviderTag, Word};
pub use wordlist::{LearningStats, SpacedRepetitionData, Temperature, Visibility, WordList, WordListItem};
