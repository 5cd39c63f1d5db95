//! Learned words with time-decayed unigram/bigram frequencies.
//!
//! Records committed words and reports frequency × recency scores so that
//! frequently typed words are suggested in later sessions. Words that no
//! dictionary knew when first typed are stored demoted until typed again.

mod dictionary;
mod persistence;
pub mod wal;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::dict::MAX_PROBABILITY;
use crate::settings::settings;

pub use dictionary::UserHistoryDictionary;

const MAGIC: &[u8; 4] = b"LFUH";
const VERSION: u8 = 1;

/// Frequency contributed by each use before decay.
const FREQUENCY_PER_USE: i32 = 40;
/// A demoted entry becomes valid once typed this many times.
const VALID_AFTER_COUNT: u32 = 2;

#[derive(Clone, Default)]
pub struct UserHistory {
    /// word → HistoryEntry
    unigrams: HashMap<String, HistoryEntry>,
    /// prev word → (next word → HistoryEntry)
    bigrams: HashMap<String, HashMap<String, HistoryEntry>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub count: u32,
    pub last_used: u64,
    /// Some dictionary knew the word when it was recorded.
    pub valid: bool,
}

impl HistoryEntry {
    fn is_demoted(&self) -> bool {
        !self.valid && self.count < VALID_AFTER_COUNT
    }

    /// Decayed frequency in `0..=MAX_PROBABILITY`. Demoted entries report 0;
    /// any other entry reports at least 1.
    fn frequency(&self, now: u64) -> i32 {
        if self.is_demoted() {
            return 0;
        }
        let raw = (self.count as i32).saturating_mul(FREQUENCY_PER_USE).min(MAX_PROBABILITY);
        ((raw as f64 * decay(self.last_used, now)) as i32).max(1)
    }

    fn touch(&mut self, is_valid: bool, count: u32, timestamp: u64) {
        self.count = self.count.saturating_add(count);
        self.last_used = self.last_used.max(timestamp);
        self.valid |= is_valid;
    }
}

/// Flat serialization format for bincode.
#[derive(Serialize, Deserialize)]
struct UserHistoryData {
    unigrams: Vec<UnigramRecord>,
    bigrams: Vec<BigramRecord>,
}

#[derive(Serialize, Deserialize)]
struct UnigramRecord {
    word: String,
    count: u32,
    last_used: u64,
    valid: bool,
}

#[derive(Serialize, Deserialize)]
struct BigramRecord {
    prev: String,
    next: String,
    count: u32,
    last_used: u64,
    valid: bool,
}

pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn decay(last_used: u64, now: u64) -> f64 {
    let hours = (now.saturating_sub(last_used)) as f64 / 3600.0;
    1.0 / (1.0 + hours / settings().history.half_life_hours)
}

fn eviction_score(entry: &HistoryEntry, now: u64) -> f64 {
    entry.count as f64 * decay(entry.last_used, now)
}

/// Keys of the `count - max` lowest-scoring entries.
fn lowest_scoring<K>(
    entries: impl Iterator<Item = (K, f64)>,
    count: usize,
    max: usize,
) -> Vec<K> {
    if count <= max {
        return Vec::new();
    }
    let mut all: Vec<(K, f64)> = entries.collect();
    let to_remove = count - max;
    all.select_nth_unstable_by(to_remove - 1, |a, b| {
        a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
    });
    all.truncate(to_remove);
    all.into_iter().map(|(k, _)| k).collect()
}

impl UserHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `word` typed `count` times after `prev` at `timestamp`
    /// (seconds since the epoch).
    pub fn record_at(
        &mut self,
        prev: Option<&str>,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) {
        let fresh = || HistoryEntry {
            count: 0,
            last_used: timestamp,
            valid: false,
        };
        self.unigrams
            .entry(word.to_string())
            .or_insert_with(fresh)
            .touch(is_valid, count, timestamp);

        if let Some(prev) = prev {
            self.bigrams
                .entry(prev.to_string())
                .or_default()
                .entry(word.to_string())
                .or_insert_with(fresh)
                .touch(is_valid, count, timestamp);
        }

        self.evict(now_epoch().max(timestamp));
    }

    /// Forget `word`, including every bigram it takes part in.
    pub fn remove(&mut self, word: &str) -> bool {
        let removed = self.unigrams.remove(word).is_some();
        self.bigrams.remove(word);
        self.bigrams.retain(|_, inner| {
            inner.remove(word);
            !inner.is_empty()
        });
        removed
    }

    pub fn clear(&mut self) {
        self.unigrams.clear();
        self.bigrams.clear();
    }

    pub fn len(&self) -> usize {
        self.unigrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unigrams.is_empty()
    }

    pub fn entry(&self, word: &str) -> Option<&HistoryEntry> {
        self.unigrams.get(word)
    }

    /// Decayed frequency of `word`, `None` if never recorded.
    pub fn frequency(&self, word: &str, now: u64) -> Option<i32> {
        self.unigrams.get(word).map(|e| e.frequency(now))
    }

    /// Recorded and not demoted.
    pub fn is_valid(&self, word: &str) -> bool {
        self.unigrams.get(word).is_some_and(|e| !e.is_demoted())
    }

    /// Words seen after `prev`, highest frequency first.
    pub fn successors(&self, prev: &str, now: u64) -> Vec<(String, i32)> {
        let Some(inner) = self.bigrams.get(prev) else {
            return Vec::new();
        };
        let mut results: Vec<(String, i32)> = inner
            .iter()
            .map(|(next, entry)| (next.clone(), entry.frequency(now)))
            .filter(|(_, freq)| *freq > 0)
            .collect();
        results.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        results
    }

    /// Every word with its decayed frequency, sorted by word.
    pub fn words(&self, now: u64) -> Vec<(String, i32)> {
        let mut words: Vec<(String, i32)> = self
            .unigrams
            .iter()
            .map(|(w, e)| (w.clone(), e.frequency(now)))
            .collect();
        words.sort();
        words
    }

    /// Evict lowest-score entries when exceeding capacity.
    fn evict(&mut self, now: u64) {
        let s = settings();
        let unigrams = lowest_scoring(
            self.unigrams
                .iter()
                .map(|(w, e)| (w.clone(), eviction_score(e, now))),
            self.unigrams.len(),
            s.history.max_unigrams,
        );
        for word in unigrams {
            self.unigrams.remove(&word);
        }

        let bigram_count: usize = self.bigrams.values().map(HashMap::len).sum();
        let bigrams = lowest_scoring(
            self.bigrams.iter().flat_map(|(prev, inner)| {
                inner
                    .iter()
                    .map(move |(next, e)| ((prev.clone(), next.clone()), eviction_score(e, now)))
            }),
            bigram_count,
            s.history.max_bigrams,
        );
        for (prev, next) in bigrams {
            if let Some(inner) = self.bigrams.get_mut(&prev) {
                inner.remove(&next);
                if inner.is_empty() {
                    self.bigrams.remove(&prev);
                }
            }
        }
    }
}
