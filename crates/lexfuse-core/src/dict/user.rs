//! User dictionary with runtime word registration.
//!
//! BTreeMap-based dictionary implementing [`ExpandableDictionary`]. Uses
//! `RwLock` for interior mutability so that words can be added while the
//! typing thread holds a reference through its dictionary group.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    rank_words, DictKind, Dictionary, DictionaryStats, ExpandableDictionary, NOT_A_PROBABILITY,
};
use crate::locale::Locale;
use crate::suggestion::{SuggestedWordInfo, SuggestionQuery};

const MAGIC: &[u8; 4] = b"LFUW";
const VERSION: u8 = 1;

/// Frequency given to words the user adds explicitly.
pub const USER_WORD_FREQUENCY: i32 = 250;

pub struct UserDictionary {
    locale: Option<Locale>,
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, i32>>,
    dirty: AtomicBool,
    closed: AtomicBool,
}

impl UserDictionary {
    /// In-memory dictionary with no backing file.
    pub fn new(locale: Option<Locale>) -> Self {
        Self {
            locale,
            path: None,
            entries: RwLock::new(BTreeMap::new()),
            dirty: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Open from file, returning an empty dictionary if the file doesn't exist.
    pub fn open(path: &Path, locale: Option<Locale>) -> Result<Self, io::Error> {
        let entries = match fs::read(path) {
            Ok(bytes) => decode(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        debug!(path = %path.display(), words = entries.len(), "user dictionary opened");
        Ok(Self {
            locale,
            path: Some(path.to_path_buf()),
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, i32>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, i32>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Register a word with the default user frequency.
    pub fn register(&self, word: &str) -> bool {
        self.add_unigram_entry(word, USER_WORD_FREQUENCY, 0)
    }

    /// Serialize to bytes (LFUW format).
    pub fn to_bytes(&self) -> Result<Vec<u8>, io::Error> {
        let records: Vec<UserWordRecord> = self
            .read()
            .iter()
            .map(|(word, &frequency)| UserWordRecord {
                word: word.clone(),
                frequency,
            })
            .collect();
        let body = bincode::serialize(&records).map_err(io::Error::other)?;
        let mut buf = Vec::with_capacity(5 + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Atomic write: write to .tmp then rename.
    pub fn save(&self, path: &Path) -> Result<(), io::Error> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<BTreeMap<String, i32>, io::Error> {
    if bytes.len() < 5 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "too short"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad magic"));
    }
    if bytes[4] != VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported version",
        ));
    }
    let records: Vec<UserWordRecord> = bincode::deserialize(&bytes[5..])
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(records.into_iter().map(|r| (r.word, r.frequency)).collect())
}

impl Dictionary for UserDictionary {
    fn kind(&self) -> DictKind {
        DictKind::User
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
        let map = self.read();
        rank_words(map.iter().map(|(w, f)| (w.as_str(), *f)), query, DictKind::User)
    }

    fn is_initialized(&self) -> bool {
        !self.is_closed()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to save user dictionary on close");
        }
    }
}

impl ExpandableDictionary for UserDictionary {
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
        let added = self.write().insert(word.to_string(), frequency).is_none();
        self.dirty.store(true, Ordering::Release);
        added
    }

    fn remove_unigram_entry(&self, word: &str) -> bool {
        let removed = self.write().remove(word).is_some();
        if removed {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    fn clear(&self) {
        self.write().clear();
        self.dirty.store(true, Ordering::Release);
    }

    fn flush(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if self.dirty.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.save(path) {
                self.dirty.store(true, Ordering::Release);
                return Err(e);
            }
        }
        Ok(())
    }

    fn stats(&self) -> DictionaryStats {
        DictionaryStats {
            kind: DictKind::User,
            locale: self.locale.as_ref().map(ToString::to_string),
            word_count: self.read().len(),
            file: self.path.clone(),
            file_size: self
                .path
                .as_deref()
                .and_then(|p| fs::metadata(p).ok())
                .map_or(0, |m| m.len()),
        }
    }

    fn dump_words(&self) -> Vec<(String, i32)> {
        self.read()
            .iter()
            .map(|(w, f)| (w.clone(), *f))
            .collect()
    }
}

/// Flat serialization record.
#[derive(Serialize, Deserialize)]
struct UserWordRecord {
    word: String,
    frequency: i32,
}
