//! Dictionary handles and their storage.
//!
//! Every loaded dictionary is reached through the [`Dictionary`] trait. Read/write
//! kinds (user, user-history, contacts) additionally implement
//! [`ExpandableDictionary`]. `BinaryDictionary` reads the on-disk word-list
//! format and `DictionaryCollection` fuses several of them into one main dictionary.

mod binary;
mod collection;
pub mod contacts;
mod emoji;
pub mod factory;
pub mod header;
pub mod user;

use std::fmt;
use std::io;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::settings::settings;
use crate::suggestion::{ComposedData, SuggestedWordInfo, SuggestionKind, SuggestionQuery};

pub use binary::{BinaryDictionary, BigramRecord, DictionaryBuilder, WordRecord};
pub use collection::DictionaryCollection;
pub use contacts::{ContactsDictionary, ContactsProvider};
pub use emoji::EmojiDictionary;
pub use factory::{DictionaryFactory, SubDictParams};
pub use header::DictionaryHeader;
pub use user::UserDictionary;

/// Frequency reported for a word a dictionary does not know.
pub const NOT_A_PROBABILITY: i32 = -1;
/// Initial value of the language-model vs. spatial-model blend weight.
pub const NOT_A_WEIGHT_OF_LANG_MODEL_VS_SPATIAL_MODEL: f32 = -1.0;
/// Highest probability a word-list entry can carry.
pub const MAX_PROBABILITY: i32 = 255;

/// Score bonus for the word matching the input exactly.
pub(crate) const EXACT_MATCH_BONUS: i32 = 256;
/// Score scale so that locale weights below 1.0 still separate candidates.
const SCORE_SCALE: f32 = 100.0;

pub(crate) fn scaled(raw: i32, weight: f32) -> i32 {
    (raw as f32 * weight * SCORE_SCALE).round() as i32
}

/// Rank `(word, frequency)` pairs of a read/write dictionary against the
/// composed input: case-insensitive prefix matches, the exact match boosted.
/// Entries with no positive frequency are never suggested.
pub(crate) fn rank_words<'a>(
    words: impl IntoIterator<Item = (&'a str, i32)>,
    query: &SuggestionQuery<'_>,
    kind: DictKind,
) -> Option<Vec<SuggestedWordInfo>> {
    let weight = query.weight_for_locale;
    let typed = &query.composed.typed_word;
    if weight <= 0.0 || typed.is_empty() {
        return None;
    }
    let folded = typed.to_lowercase();
    let mut out: Vec<SuggestedWordInfo> = words
        .into_iter()
        .filter(|(_, freq)| *freq > 0)
        .filter_map(|(word, freq)| {
            let lower = word.to_lowercase();
            if !lower.starts_with(&folded) {
                return None;
            }
            let (bonus, sk) = if lower == folded {
                (EXACT_MATCH_BONUS, SuggestionKind::Typed)
            } else {
                (0, SuggestionKind::Completion)
            };
            Some(SuggestedWordInfo::new(word, scaled(freq + bonus, weight), sk, kind))
        })
        .collect();
    if out.is_empty() {
        return None;
    }
    out.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.word.cmp(&b.word)));
    out.truncate(settings().suggestions.per_dictionary_limit);
    Some(out)
}

/// Unified error type for dictionary files and dictionary construction.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header (too short)")]
    InvalidHeader,

    #[error("invalid magic bytes (expected LFDX)")]
    InvalidMagic,

    #[error("unsupported format version: {0}")]
    UnsupportedFormat(u8),

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no constructor registered for {0} dictionaries")]
    MissingFactory(DictKind),
}

/// Dictionary kind tag. One handle per kind per locale group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DictKind {
    Main,
    Emoji,
    User,
    UserHistory,
    Contacts,
    /// Experimental model-backed dictionary. No built-in constructor.
    Neural,
}

impl DictKind {
    /// Query order used by suggestion, validity and frequency scans.
    pub const ALL: [DictKind; 6] = [
        DictKind::Main,
        DictKind::Emoji,
        DictKind::Contacts,
        DictKind::UserHistory,
        DictKind::User,
        DictKind::Neural,
    ];

    /// Read/write kinds backed by an [`ExpandableDictionary`].
    pub const DYNAMIC: [DictKind; 3] =
        [DictKind::Contacts, DictKind::UserHistory, DictKind::User];

    pub fn name(self) -> &'static str {
        match self {
            DictKind::Main => "main",
            DictKind::Emoji => "emoji",
            DictKind::User => "user",
            DictKind::UserHistory => "history",
            DictKind::Contacts => "contacts",
            DictKind::Neural => "neural",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn is_dynamic(self) -> bool {
        Self::DYNAMIC.contains(&self)
    }
}

impl fmt::Display for DictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A loaded dictionary. Implementations are internally synchronized: every
/// method may be called from the typing thread while the loader thread
/// holds another reference.
pub trait Dictionary: Send + Sync {
    fn kind(&self) -> DictKind;

    fn is_valid_word(&self, word: &str) -> bool;

    /// Probability of `word` (0..=255), or [`NOT_A_PROBABILITY`].
    fn frequency(&self, word: &str) -> i32;

    /// Candidates for the composed input, scored with the query's locale
    /// weight. `None` means the dictionary has nothing to contribute.
    fn suggestions(
        &self,
        query: &SuggestionQuery<'_>,
        blend_weight: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>>;

    /// Characters that can follow the composed input in some word.
    fn next_valid_code_points(&self, _composed: &ComposedData) -> Option<Vec<char>> {
        None
    }

    fn is_initialized(&self) -> bool {
        true
    }

    /// Release the underlying resources. Queries after `close` behave as an
    /// empty dictionary.
    fn close(&self) {}
}

/// Size and location of a read/write dictionary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictionaryStats {
    pub kind: DictKind,
    pub locale: Option<String>,
    pub word_count: usize,
    pub file: Option<PathBuf>,
    pub file_size: u64,
}

/// A read/write dictionary kind.
pub trait ExpandableDictionary: Dictionary {
    fn as_dictionary(&self) -> &(dyn Dictionary + 'static);

    fn locale(&self) -> Option<&Locale>;

    /// Add or update a single word. Returns `true` if the word was new.
    fn add_unigram_entry(&self, word: &str, frequency: i32, timestamp: u64) -> bool;

    /// Returns `true` if the word was present.
    fn remove_unigram_entry(&self, word: &str) -> bool;

    /// Record `word` as typed after `ngram`. `is_valid == false` stores the
    /// entry demoted.
    fn update_entries_for_word(
        &self,
        ngram: &NgramContext,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) {
        let _ = (ngram, count);
        let frequency = if is_valid { MAX_PROBABILITY } else { 0 };
        self.add_unigram_entry(word, frequency, timestamp);
    }

    fn clear(&self);

    /// Persist pending changes.
    fn flush(&self) -> io::Result<()>;

    fn stats(&self) -> DictionaryStats;

    /// All words with their frequency, sorted by word.
    fn dump_words(&self) -> Vec<(String, i32)>;
}

/// A handle held by a dictionary group: either a read-only dictionary or a
/// read/write one. Derefs to the common [`Dictionary`] interface.
#[derive(Clone)]
pub enum DictHandle {
    ReadOnly(Arc<dyn Dictionary>),
    Expandable(Arc<dyn ExpandableDictionary>),
}

impl DictHandle {
    pub fn expandable(&self) -> Option<&Arc<dyn ExpandableDictionary>> {
        match self {
            DictHandle::ReadOnly(_) => None,
            DictHandle::Expandable(d) => Some(d),
        }
    }

    /// Whether both handles refer to the same dictionary object.
    pub fn same_as(&self, other: &DictHandle) -> bool {
        std::ptr::addr_eq(
            self.deref() as *const dyn Dictionary,
            other.deref() as *const dyn Dictionary,
        )
    }
}

impl Deref for DictHandle {
    type Target = dyn Dictionary;

    fn deref(&self) -> &Self::Target {
        match self {
            DictHandle::ReadOnly(d) => d.as_ref(),
            DictHandle::Expandable(d) => d.as_dictionary(),
        }
    }
}

impl fmt::Debug for DictHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            DictHandle::ReadOnly(_) => "ReadOnly",
            DictHandle::Expandable(_) => "Expandable",
        };
        write!(f, "DictHandle::{variant}({})", self.kind())
    }
}
