//! Persistence facade: one trait per entity family, each enforcing
//! optimistic concurrency on writes.
//!
//! A write always carries the entity's current `version`; the repository
//! compares it against the stored value and either applies the write and
//! increments `version` by exactly one, or returns
//! `core::Error::VersionConflict` without mutating anything.

use async_trait::async_trait;

use crate::definition::{Definition, Example, Pronunciation};
use crate::entry::{Fact, SynthesizedEntry};
use crate::ids::{DefinitionId, FactId, PronunciationId, SynthesizedEntryId, WordId, WordListId};
use crate::word::{ProviderData, Word};
use crate::wordlist::WordList;
use crate::Result;

#[async_trait]
pub trait WordRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: WordId) -> Result<Option<Word>>;
    async fn find_by_normalized(&self, normalized: &str, language: &str) -> Result<Option<Word>>;
    /// Inserts if absent, otherwise returns the existing row unchanged
    /// (`(normalized, language)` is unique, so this is the resolve step's
    /// get-or-create).
    async fn get_or_create(&self, text: &str, language: &str) -> Result<Word>;
    /// Cascade-deletes the word and everything it owns: ProviderData,
    /// Definitions (and their Examples), Pronunciation, Facts,
    /// SynthesizedEntry.
    async fn delete_cascade(&self, id: WordId) -> Result<()>;
}

#[async_trait]
pub trait ProviderDataRepository: Send + Sync + 'static {
    async fn find_by_word(&self, word_id: WordId) -> Result<Vec<ProviderData>>;
    /// Inserts on first fetch; on forced refresh, replaces the row for
    /// `(word_id, provider)` rather than appending a duplicate.
    async fn upsert(&self, data: ProviderData) -> Result<ProviderData>;
    async fn delete_by_word(&self, word_id: WordId) -> Result<()>;
}

#[async_trait]
pub trait DefinitionRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: DefinitionId) -> Result<Option<Definition>>;
    async fn find_by_ids(&self, ids: &[DefinitionId]) -> Result<Vec<Definition>>;
    async fn find_by_word(&self, word_id: WordId) -> Result<Vec<Definition>>;
    async fn insert(&self, definition: Definition) -> Result<Definition>;
    /// Optimistic-concurrency update: `expected_version` must match the
    /// stored `version` or this returns `Err(VersionConflict)`.
    async fn update(&self, definition: Definition, expected_version: u64) -> Result<Definition>;
    async fn delete_by_word(&self, word_id: WordId) -> Result<()>;
}

#[async_trait]
pub trait ExampleRepository: Send + Sync + 'static {
    async fn find_by_definition(&self, definition_id: DefinitionId) -> Result<Vec<Example>>;
    async fn insert_many(&self, examples: Vec<Example>) -> Result<Vec<Example>>;
    async fn delete_by_definition(&self, definition_id: DefinitionId) -> Result<()>;
}

#[async_trait]
pub trait PronunciationRepository: Send + Sync + 'static {
    async fn find_by_word(&self, word_id: WordId) -> Result<Option<Pronunciation>>;
    async fn upsert(&self, pronunciation: Pronunciation) -> Result<Pronunciation>;
    async fn delete(&self, id: PronunciationId) -> Result<()>;
}

#[async_trait]
pub trait FactRepository: Send + Sync + 'static {
    async fn find_by_ids(&self, ids: &[FactId]) -> Result<Vec<Fact>>;
    async fn insert_many(&self, facts: Vec<Fact>) -> Result<Vec<Fact>>;
    async fn delete_by_word(&self, word_id: WordId) -> Result<()>;
}

#[async_trait]
pub trait SynthesizedEntryRepository: Send + Sync + 'static {
    async fn find_by_word(&self, word_id: WordId) -> Result<Option<SynthesizedEntry>>;
    async fn find_by_id(&self, id: SynthesizedEntryId) -> Result<Option<SynthesizedEntry>>;
    /// Inserts a new entry. Fails with `Conflict` if one already exists for
    /// `word_id` (at most one per word); callers that intend to replace
    /// on `force_refresh` must call `replace` instead.
    async fn insert(&self, entry: SynthesizedEntry) -> Result<SynthesizedEntry>;
    async fn replace(&self, entry: SynthesizedEntry, expected_version: u64) -> Result<SynthesizedEntry>;
    async fn update(&self, entry: SynthesizedEntry, expected_version: u64) -> Result<SynthesizedEntry>;
    async fn delete_by_word(&self, word_id: WordId) -> Result<()>;
}

#[async_trait]
pub trait WordListRepository: Send + Sync + 'static {
    async fn find_by_id(&self, id: WordListId) -> Result<Option<WordList>>;
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<WordList>>;
    async fn insert(&self, list: WordList) -> Result<WordList>;
    async fn update(&self, list: WordList, expected_version: u64) -> Result<WordList>;
    async fn delete(&self, id: WordListId) -> Result<()>;
}
