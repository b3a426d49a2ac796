//! `Definition`, `Example`, and `Pronunciation`: the facet-bearing half of the
//! data model. `Definition` carries every enhancement-engine facet field as
//! an independently optional attribute.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AudioFileId, DefinitionId, ExampleId, ImageId, PronunciationId, WordId};

/// Groups raw provider `Definition`s that the cluster stage judged to share a
/// meaning. Singleton clusters (unplaced definitions) are valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeaningCluster {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transitivity {
    Transitive,
    Intransitive,
    Ambitransitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefinitionId,
    pub word_id: WordId,
    pub part_of_speech: String,
    pub text: String,
    pub sense_number: u32,
    pub meaning_cluster: Option<MeaningCluster>,

    // Facet fields. Every one is independently optional; the enhancement
    // engine treats "non-empty" as "already computed" and skips unless
    // `force` is set.
    pub synonyms: Option<Vec<String>>,
    pub antonyms: Option<Vec<String>>,
    pub example_ids: Option<Vec<ExampleId>>,
    pub image_ids: Option<Vec<ImageId>>,
    pub word_forms: Option<Vec<String>>,
    pub cefr_level: Option<CefrLevel>,
    pub frequency_band: Option<u8>,
    pub language_register: Option<String>,
    pub domain: Option<String>,
    /// Widened to a list per the Open Question resolution recorded in
    /// DESIGN.md: the original single-region field cannot hold a
    /// component call that returns several regional variants.
    pub region: Option<Vec<String>>,
    pub grammar_patterns: Option<Vec<String>>,
    pub collocations: Option<Vec<String>>,
    pub usage_notes: Option<Vec<String>>,
    pub transitivity: Option<Transitivity>,

    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Definition {
    pub fn new(word_id: WordId, part_of_speech: impl Into<String>, text: impl Into<String>, sense_number: u32) -> Self {
        let now = Utc::now();
        Self {
            id: DefinitionId::new(),
            word_id,
            part_of_speech: part_of_speech.into(),
            text: text.into(),
            sense_number,
            meaning_cluster: None,
            synonyms: None,
            antonyms: None,
            example_ids: None,
            image_ids: None,
            word_forms: None,
            cefr_level: None,
            frequency_band: None,
            language_register: None,
            domain: None,
            region: None,
            grammar_patterns: None,
            collocations: None,
            usage_notes: None,
            transitivity: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given component's backing field already holds data. The
    /// enhancement engine uses this to decide whether `force=false` should
    /// skip a (definition, component) pair.
    pub fn has_component(&self, component: crate::component::Component) -> bool {
        use crate::component::Component::*;
        match component {
            Synonyms => self.synonyms.as_ref().is_some_and(|v| !v.is_empty()),
            Antonyms => self.antonyms.as_ref().is_some_and(|v| !v.is_empty()),
            Examples => self.example_ids.as_ref().is_some_and(|v| !v.is_empty()),
            CefrLevel => self.cefr_level.is_some(),
            FrequencyBand => self.frequency_band.is_some(),
            Register => self.language_register.is_some(),
            Domain => self.domain.is_some(),
            GrammarPatterns => self.grammar_patterns.as_ref().is_some_and(|v| !v.is_empty()),
            Collocations => self.collocations.as_ref().is_some_and(|v| !v.is_empty()),
            UsageNotes => self.usage_notes.as_ref().is_some_and(|v| !v.is_empty()),
            RegionalVariants => self.region.as_ref().is_some_and(|v| !v.is_empty()),
            WordForms => self.word_forms.as_ref().is_some_and(|v| !v.is_empty()),
            // Word-level components never back a Definition field.
            Pronunciation | Etymology | Facts => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleType {
    Provider,
    Generated,
    Literature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub id: ExampleId,
    pub definition_id: DefinitionId,
    pub text: String,
    pub kind: ExampleType,
    pub quality_score: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Example {
    pub fn new(definition_id: DefinitionId, text: impl Into<String>, kind: ExampleType) -> Self {
        Self {
            id: ExampleId::new(),
            definition_id,
            text: text.into(),
            kind,
            quality_score: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pronunciation {
    pub id: PronunciationId,
    pub word_id: WordId,
    pub phonetic: String,
    pub ipa: String,
    pub audio_file_ids: Vec<AudioFileId>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pronunciation {
    pub fn new(word_id: WordId, phonetic: impl Into<String>, ipa: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PronunciationId::new(),
            word_id,
            phonetic: phonetic.into(),
            ipa: ipa.into(),
            audio_file_ids: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
