//! Suggestion request and result types shared by every dictionary kind.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::dict::DictKind;
use crate::ngram::NgramContext;
use crate::unicode::code_point_count;

/// The word currently being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedData {
    pub typed_word: String,
    /// Gesture (swipe) input rather than tap typing.
    pub is_batch_mode: bool,
}

impl ComposedData {
    pub fn typing(word: &str) -> Self {
        Self {
            typed_word: word.to_string(),
            is_batch_mode: false,
        }
    }

    pub fn gesture(word: &str) -> Self {
        Self {
            typed_word: word.to_string(),
            is_batch_mode: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.typed_word.is_empty()
    }
}

/// Opaque handle to the keyboard's proximity model, owned by the keyboard
/// layer and passed through to dictionaries untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProximityInfo {
    pub handle: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuggestionSettings {
    pub block_offensive: bool,
    /// Keep the unfiltered candidate list alongside the capped results.
    pub debug_raw_suggestions: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputStyle {
    #[default]
    None,
    Typing,
    UpdateBatch,
    TailBatch,
    ApplicationSpecified,
    Recorrection,
    Prediction,
}

/// Everything a dictionary needs to produce suggestions for one query.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionQuery<'a> {
    pub composed: &'a ComposedData,
    pub ngram: &'a NgramContext,
    pub proximity: &'a ProximityInfo,
    pub settings: &'a SuggestionSettings,
    pub session_id: i32,
    /// Confidence weight of the dictionary's locale (0.0..=1.0).
    pub weight_for_locale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Typed,
    Correction,
    Completion,
    Prediction,
    Emoji,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedWordInfo {
    pub word: String,
    pub score: i32,
    pub kind: SuggestionKind,
    pub source: DictKind,
    pub possibly_offensive: bool,
}

impl SuggestedWordInfo {
    pub fn new(word: &str, score: i32, kind: SuggestionKind, source: DictKind) -> Self {
        Self {
            word: word.to_string(),
            score,
            kind,
            source,
            possibly_offensive: false,
        }
    }
}

/// Rank order: higher score first, then shorter word, then lexicographic.
/// Two entries comparing equal are the same suggestion.
#[derive(Debug, Clone)]
struct Ranked(SuggestedWordInfo);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .cmp(&self.0.score)
            .then_with(|| code_point_count(&self.0.word).cmp(&code_point_count(&other.0.word)))
            .then_with(|| self.0.word.cmp(&other.0.word))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Ranked, capacity-capped suggestion set fused from several dictionaries.
#[derive(Debug, Clone)]
pub struct SuggestionResults {
    ranked: BTreeSet<Ranked>,
    capacity: usize,
    pub is_beginning_of_sentence: bool,
    pub first_suggestion_exceeds_confidence_threshold: bool,
    /// Every candidate received, before capping. Only kept on request.
    pub raw_suggestions: Option<Vec<SuggestedWordInfo>>,
}

impl SuggestionResults {
    pub fn new(capacity: usize, is_beginning_of_sentence: bool, keep_raw: bool) -> Self {
        Self {
            ranked: BTreeSet::new(),
            capacity,
            is_beginning_of_sentence,
            first_suggestion_exceeds_confidence_threshold: false,
            raw_suggestions: keep_raw.then(Vec::new),
        }
    }

    pub fn add(&mut self, info: SuggestedWordInfo) {
        self.ranked.insert(Ranked(info));
        if self.ranked.len() > self.capacity {
            self.ranked.pop_last();
        }
    }

    pub fn add_all(&mut self, infos: impl IntoIterator<Item = SuggestedWordInfo>) {
        for info in infos {
            self.add(info);
        }
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first(&self) -> Option<&SuggestedWordInfo> {
        self.ranked.first().map(|r| &r.0)
    }

    /// Suggestions in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &SuggestedWordInfo> {
        self.ranked.iter().map(|r| &r.0)
    }

    /// Rank-ordered words with later duplicates (same word from another
    /// dictionary) removed.
    pub fn unique_words(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.iter()
            .map(|info| info.word.as_str())
            .filter(|w| seen.insert(*w))
            .collect()
    }
}
