//! `WordList` and `WordListItem`: the user-facing study list, distinct from
//! the Word/Definition graph it merely references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DefinitionId, WordId, WordListId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Shared,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temperature {
    Hot,
    Cold,
}

const SM2_MIN_EASE_FACTOR: f32 = 1.3;
const SM2_MAX_EASE_FACTOR: f32 = 3.0;
const SM2_DEFAULT_EASE_FACTOR: f32 = 2.5;
const SM2_QUALITY_THRESHOLD: u8 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacedRepetitionData {
    pub repetitions: u32,
    pub interval_days: u32,
    pub ease_factor: f32,
    pub next_review: DateTime<Utc>,
    pub history: Vec<DateTime<Utc>>,
    pub lapse_count: u32,
}

impl Default for SpacedRepetitionData {
    fn default() -> Self {
        Self {
            repetitions: 0,
            interval_days: 1,
            ease_factor: SM2_DEFAULT_EASE_FACTOR,
            next_review: Utc::now(),
            history: Vec::new(),
            lapse_count: 0,
        }
    }
}

impl SpacedRepetitionData {
    /// Applies an SM-2 review outcome for a 0-5 quality score. Below
    /// `SM2_QUALITY_THRESHOLD` the item is treated as a lapse and restarted
    /// at a one-day interval; otherwise `repetitions` increments first and
    /// the new interval is computed from the post-increment count — mirroring
    /// `update_sm2`'s evaluation order, where `calculate_next_interval` only
    /// ever observes `repetitions >= 1` (its `repetitions == 0` arm is
    /// unreachable, kept here only for parity with that dead branch) — before
    /// the interval grows by the ease factor, which itself adjusts toward the
    /// quality score.
    pub fn record_review(&mut self, quality: u8) {
        let quality = quality.min(5);
        if quality < SM2_QUALITY_THRESHOLD {
            self.repetitions = 0;
            self.interval_days = 1;
            self.lapse_count += 1;
        } else {
            self.repetitions += 1;
            self.interval_days = match self.repetitions {
                0 => 1,
                1 => 6,
                _ => (self.interval_days as f32 * self.ease_factor).round() as u32,
            };
        }

        if quality >= SM2_QUALITY_THRESHOLD {
            let q = quality as f32;
            let delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
            self.ease_factor = (self.ease_factor + delta).clamp(SM2_MIN_EASE_FACTOR, SM2_MAX_EASE_FACTOR);
        }

        let now = Utc::now();
        self.next_review = now + chrono::Duration::days(self.interval_days as i64);
        self.history.push(now);
    }

    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.next_review <= at
    }

    pub fn retention_rate(&self) -> f32 {
        let total = self.repetitions + self.lapse_count;
        if total == 0 {
            0.0
        } else {
            self.repetitions as f32 / total as f32
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordListItem {
    pub word_id: WordId,
    pub definition_id: Option<DefinitionId>,
    pub spaced_repetition: SpacedRepetitionData,
    pub mastery_level: f32,
    pub temperature: Temperature,
    pub frequency: u32,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl WordListItem {
    pub fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            definition_id: None,
            spaced_repetition: SpacedRepetitionData::default(),
            mastery_level: 0.0,
            temperature: Temperature::Cold,
            frequency: 0,
            notes: None,
            tags: Vec::new(),
        }
    }

    /// Records a review session, updating spaced-repetition data, mastery
    /// tier, and temperature in one step.
    pub fn review(&mut self, quality: u8) {
        self.spaced_repetition.record_review(quality);
        self.temperature = Temperature::Hot;
        self.mastery_level = if self.spaced_repetition.repetitions >= 10 && self.spaced_repetition.ease_factor >= 2.5 {
            1.0
        } else if self.spaced_repetition.repetitions >= 5 {
            0.66
        } else if self.spaced_repetition.repetitions > 0 {
            0.33
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_words: u32,
    pub mastered_words: u32,
    pub average_mastery: f32,
    pub due_for_review: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordList {
    pub id: WordListId,
    pub name: String,
    /// Content hash of `words`, recomputed on every mutation. Doubles as the
    /// corpus invalidation key: a changed `hash_id` means the
    /// per-list corpus must be rebuilt.
    pub hash_id: String,
    pub words: Vec<WordListItem>,
    pub owner_id: String,
    pub visibility: Visibility,
    pub learning_stats: LearningStats,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WordList {
    pub fn new(name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut list = Self {
            id: WordListId::new(),
            name: name.into(),
            hash_id: String::new(),
            words: Vec::new(),
            owner_id: owner_id.into(),
            visibility: Visibility::Private,
            learning_stats: LearningStats::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        list.recompute_hash();
        list
    }

    /// Recomputes `hash_id` from the current word set. Call after any
    /// mutation of `words` so corpus invalidation observes the change.
    pub fn recompute_hash(&mut self) {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        let mut ids: Vec<String> = self.words.iter().map(|w| w.word_id.to_string()).collect();
        ids.sort();
        for id in ids {
            hasher.update(id.as_bytes());
        }
        self.hash_id = format!("{:x}", hasher.finalize());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_quality_review_resets_repetitions_and_records_lapse() {
        let mut srs = SpacedRepetitionData::default();
        srs.record_review(5);
        srs.record_review(1);
        assert_eq!(srs.repetitions, 0);
        assert_eq!(srs.interval_days, 1);
        assert_eq!(srs.lapse_count, 1);
    }

    #[test]
    fn successive_good_reviews_grow_interval_and_repetitions() {
        // Mirrors `update_sm2`'s actual schedule for a repeated quality=5
        // train: 6, 16, 43, ... (repetitions increments before the interval
        // is computed from it).
        let mut srs = SpacedRepetitionData::default();
        srs.record_review(5);
        assert_eq!(srs.repetitions, 1);
        assert_eq!(srs.interval_days, 6);
        srs.record_review(5);
        assert_eq!(srs.repetitions, 2);
        assert_eq!(srs.interval_days, 16);
        srs.record_review(5);
        assert_eq!(srs.repetitions, 3);
        assert_eq!(srs.interval_days, 43);
    }

    #[test]
    fn ease_factor_never_drops_below_the_sm2_floor() {
        let mut srs = SpacedRepetitionData::default();
        for _ in 0..20 {
            srs.record_review(3);
        }
        assert!(srs.ease_factor >= SM2_MIN_EASE_FACTOR);
    }

    #[test]
    fn word_list_item_review_sets_hot_and_mastery_tier() {
        let mut item = WordListItem::new(WordId::new());
        for _ in 0..5 {
            item.review(5);
        }
        assert_eq!(item.temperature, Temperature::Hot);
        assert_eq!(item.mastery_level, 0.66);
    }

    #[test]
    fn retention_rate_accounts_for_lapses() {
        let mut srs = SpacedRepetitionData::default();
        srs.record_review(5);
        srs.record_review(1);
        srs.record_review(5);
        assert!((srs.retention_rate() - 2.0 / 3.0).abs() < 1e-6);
    }
}
