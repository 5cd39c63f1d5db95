use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::wal::{open_with_wal, HistoryWal, WalEntry};
use super::{now_epoch, UserHistory};
use crate::dict::{
    rank_words, scaled, DictKind, Dictionary, DictionaryStats, ExpandableDictionary,
    NOT_A_PROBABILITY,
};
use crate::locale::Locale;
use crate::ngram::NgramContext;
use crate::suggestion::{SuggestedWordInfo, SuggestionKind, SuggestionQuery};

/// Per-locale, per-account learned words.
///
/// Lock order: `wal` before `history`. Readers on the typing path only take
/// the `history` read lock.
pub struct UserHistoryDictionary {
    locale: Option<Locale>,
    account: Option<String>,
    history: RwLock<UserHistory>,
    wal: Mutex<Option<HistoryWal>>,
    closed: AtomicBool,
}

impl UserHistoryDictionary {
    /// History kept in memory only.
    pub fn in_memory(locale: Option<Locale>, account: Option<String>) -> Self {
        Self {
            locale,
            account,
            history: RwLock::new(UserHistory::new()),
            wal: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Open the checkpoint at `path` and replay its WAL.
    pub fn open(path: &Path, locale: Option<Locale>, account: Option<String>) -> io::Result<Self> {
        let (history, wal) = open_with_wal(path)?;
        debug!(
            path = %path.display(),
            words = history.len(),
            replayed = wal.entry_count(),
            "user history opened"
        );
        Ok(Self {
            locale,
            account,
            history: RwLock::new(history),
            wal: Mutex::new(Some(wal)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn checkpoint_path(&self) -> Option<PathBuf> {
        self.wal_guard()
            .as_ref()
            .map(|w| w.checkpoint_path().to_path_buf())
    }

    /// A copy of the learned state.
    pub fn snapshot(&self) -> UserHistory {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, UserHistory> {
        self.history.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserHistory> {
        self.history.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn wal_guard(&self) -> MutexGuard<'_, Option<HistoryWal>> {
        self.wal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Apply `entry` in memory and append it to the WAL, compacting when the
    /// WAL grew past its threshold.
    fn apply(&self, entry: WalEntry) {
        let mut wal = self.wal_guard();
        {
            let mut history = self.write();
            match &entry {
                WalEntry::Record {
                    prev,
                    word,
                    is_valid,
                    count,
                    timestamp,
                } => history.record_at(prev.as_deref(), word, *is_valid, *count, *timestamp),
                WalEntry::Remove { word } => {
                    history.remove(word);
                }
                WalEntry::Clear => history.clear(),
            }
        }
        let Some(wal) = wal.as_mut() else {
            return;
        };
        if let Err(e) = wal.append(&entry) {
            warn!(error = %e, "failed to append user history WAL entry");
            return;
        }
        if wal.needs_compact() {
            if let Err(e) = self.checkpoint(wal) {
                warn!(error = %e, "user history compaction failed");
            }
        }
    }

    fn checkpoint(&self, wal: &mut HistoryWal) -> io::Result<()> {
        let snapshot = self.read().clone();
        snapshot.save(wal.checkpoint_path())?;
        wal.truncate_wal()?;
        debug!(path = %wal.checkpoint_path().display(), words = snapshot.len(), "user history checkpoint");
        Ok(())
    }
}

impl Dictionary for UserHistoryDictionary {
    fn kind(&self) -> DictKind {
        DictKind::UserHistory
    }

    fn is_valid_word(&self, word: &str) -> bool {
        !self.is_closed() && self.read().is_valid(word)
    }

    fn frequency(&self, word: &str) -> i32 {
        if self.is_closed() {
            return NOT_A_PROBABILITY;
        }
        // Demoted entries are not yet words.
        self.read()
            .frequency(word, now_epoch())
            .filter(|&f| f > 0)
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn suggestions(
        &self,
        query: &SuggestionQuery<'_>,
        _blend_weight: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        if self.is_closed() || query.weight_for_locale <= 0.0 {
            return None;
        }
        let now = now_epoch();
        let history = self.read();
        if query.composed.is_empty() {
            let prev = query.ngram.nth_prev_word(1)?;
            let successors = history.successors(prev, now);
            if successors.is_empty() {
                return None;
            }
            return Some(
                successors
                    .into_iter()
                    .map(|(word, freq)| {
                        SuggestedWordInfo::new(
                            &word,
                            scaled(freq, query.weight_for_locale),
                            SuggestionKind::Prediction,
                            DictKind::UserHistory,
                        )
                    })
                    .collect(),
            );
        }
        let words = history.words(now);
        rank_words(
            words.iter().map(|(w, f)| (w.as_str(), *f)),
            query,
            DictKind::UserHistory,
        )
    }

    fn is_initialized(&self) -> bool {
        !self.is_closed()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to save user history on close");
        }
    }
}

impl ExpandableDictionary for UserHistoryDictionary {
    fn as_dictionary(&self) -> &(dyn Dictionary + 'static) {
        self
    }

    fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    fn add_unigram_entry(&self, word: &str, frequency: i32, timestamp: u64) -> bool {
        if self.is_closed() || word.is_empty() {
            return false;
        }
        let added = self.read().entry(word).is_none();
        self.apply(WalEntry::Record {
            prev: None,
            word: word.to_string(),
            is_valid: frequency > 0,
            count: 1,
            timestamp,
        });
        added
    }

    fn remove_unigram_entry(&self, word: &str) -> bool {
        if self.read().entry(word).is_none() {
            return false;
        }
        self.apply(WalEntry::Remove {
            word: word.to_string(),
        });
        true
    }

    fn update_entries_for_word(
        &self,
        ngram: &NgramContext,
        word: &str,
        is_valid: bool,
        count: u32,
        timestamp: u64,
    ) {
        if self.is_closed() || word.is_empty() {
            return;
        }
        self.apply(WalEntry::Record {
            prev: ngram.nth_prev_word(1).map(str::to_string),
            word: word.to_string(),
            is_valid,
            count,
            timestamp,
        });
    }

    fn clear(&self) {
        self.apply(WalEntry::Clear);
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to save cleared user history");
        }
    }

    fn flush(&self) -> io::Result<()> {
        let mut wal = self.wal_guard();
        match wal.as_mut() {
            Some(wal) if wal.entry_count() > 0 => self.checkpoint(wal),
            _ => Ok(()),
        }
    }

    fn stats(&self) -> DictionaryStats {
        let file = self.checkpoint_path();
        let file_size = file
            .iter()
            .flat_map(|p| [p.clone(), p.with_extension("lfuh.wal")])
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();
        DictionaryStats {
            kind: DictKind::UserHistory,
            locale: self.locale.as_ref().map(ToString::to_string),
            word_count: self.read().len(),
            file,
            file_size,
        }
    }

    fn dump_words(&self) -> Vec<(String, i32)> {
        self.read().words(now_epoch())
    }
}
