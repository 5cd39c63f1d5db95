//! Dictionary built from the names in the user's address book.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::{
    rank_words, DictKind, Dictionary, DictionaryStats, ExpandableDictionary, NOT_A_PROBABILITY,
};
use crate::locale::Locale;
use crate::suggestion::{SuggestedWordInfo, SuggestionQuery};
use crate::unicode::split_words;

/// Frequency of a word taken from a contact name.
pub const CONTACT_WORD_FREQUENCY: i32 = 40;

/// Source of contact display names. Access control is the caller's concern.
pub trait ContactsProvider: Send + Sync {
    fn display_names(&self) -> Vec<String>;
}

/// Fixed list of names, for tools and tests.
impl ContactsProvider for Vec<String> {
    fn display_names(&self) -> Vec<String> {
        self.clone()
    }
}

pub struct ContactsDictionary {
    locale: Option<Locale>,
    provider: Arc<dyn ContactsProvider>,
    words: RwLock<BTreeMap<String, i32>>,
    closed: AtomicBool,
}

impl ContactsDictionary {
    pub fn new(provider: Arc<dyn ContactsProvider>, locale: Option<Locale>) -> Self {
        let dict = Self {
            locale,
            provider,
            words: RwLock::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
        };
        dict.reload();
        dict
    }

    /// Rebuild the word set from the provider.
    pub fn reload(&self) {
        let names = self.provider.display_names();
        let mut words = BTreeMap::new();
        for name in &names {
            for word in split_words(name) {
                words.insert(word.to_string(), CONTACT_WORD_FREQUENCY);
            }
        }
        debug!(names = names.len(), words = words.len(), "contacts dictionary loaded");
        *self.write() = words;
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, i32>> {
        self.words.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, i32>> {
        self.words.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Dictionary for ContactsDictionary {
    fn kind(&self) -> DictKind {
        DictKind::Contacts
    }

    fn is_valid_word(&self, word: &str) -> bool {
        !self.is_closed() && self.read().contains_key(word)
    }

    fn frequency(&self, word: &str) -> i32 {
        if self.is_closed() {
            return NOT_A_PROBABILITY;
        }
        self.read().get(word).copied().unwrap_or(NOT_A_PROBABILITY)
    }

    fn suggestions(
        &self,
        query: &SuggestionQuery<'_>,
        _blend_weight: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        if self.is_closed() {
            return None;
        }
        let words = self.read();
        rank_words(
            words.iter().map(|(w, f)| (w.as_str(), *f)),
            query,
            DictKind::Contacts,
        )
    }

    fn is_initialized(&self) -> bool {
        !self.is_closed()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.write().clear();
    }
}

impl ExpandableDictionary for ContactsDictionary {
    fn as_dictionary(&self) -> &(dyn Dictionary + 'static) {
        self
    }

    fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    fn add_unigram_entry(&self, word: &str, frequency: i32, _timestamp: u64) -> bool {
        if self.is_closed() || word.is_empty() {
            return false;
        }
        self.write().insert(word.to_string(), frequency).is_none()
    }

    fn remove_unigram_entry(&self, word: &str) -> bool {
        self.write().remove(word).is_some()
    }

    fn clear(&self) {
        self.write().clear();
    }

    /// Contents are derived from the provider; nothing to persist.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn stats(&self) -> DictionaryStats {
        DictionaryStats {
            kind: DictKind::Contacts,
            locale: self.locale.as_ref().map(ToString::to_string),
            word_count: self.read().len(),
            file: None,
            file_size: 0,
        }
    }

    fn dump_words(&self) -> Vec<(String, i32)> {
        self.read()
            .iter()
            .map(|(w, f)| (w.clone(), *f))
            .collect()
    }
}
