use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use memmap2::MmapOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::header::{DictionaryHeader, DICTIONARY_KEY, LOCALE_KEY, VERSION_KEY};
use super::{scaled, DictError, DictKind, Dictionary, EXACT_MATCH_BONUS, NOT_A_PROBABILITY};
use crate::locale::Locale;
use crate::settings::settings;
use crate::suggestion::{ComposedData, SuggestedWordInfo, SuggestionKind, SuggestionQuery};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    pub probability: u8,
    pub possibly_offensive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BigramRecord {
    pub prev: String,
    pub next: String,
    pub probability: u8,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DictionaryBody {
    words: Vec<WordRecord>,
    bigrams: Vec<BigramRecord>,
}

/// Decoded body plus lookup indexes.
struct Loaded {
    /// Sorted by word.
    words: Vec<WordRecord>,
    /// Lower-cased word and index into `words`, sorted.
    folded: Vec<(String, usize)>,
    /// Lower-cased previous word → (next word, probability).
    bigrams: HashMap<String, Vec<(String, u8)>>,
}

impl Loaded {
    fn new(body: DictionaryBody) -> Self {
        let mut words = body.words;
        words.sort_by(|a, b| a.word.cmp(&b.word));
        words.dedup_by(|a, b| a.word == b.word);
        let mut folded: Vec<(String, usize)> = words
            .iter()
            .enumerate()
            .map(|(i, r)| (r.word.to_lowercase(), i))
            .collect();
        folded.sort();
        let mut bigrams: HashMap<String, Vec<(String, u8)>> = HashMap::new();
        for b in body.bigrams {
            bigrams
                .entry(b.prev.to_lowercase())
                .or_default()
                .push((b.next, b.probability));
        }
        Self {
            words,
            folded,
            bigrams,
        }
    }

    fn find(&self, word: &str) -> Option<&WordRecord> {
        self.words
            .binary_search_by(|r| r.word.as_str().cmp(word))
            .ok()
            .map(|i| &self.words[i])
    }

    /// Records whose lower-cased form starts with `prefix` (already lower-cased).
    fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a WordRecord> + 'a {
        let start = self.folded.partition_point(|(w, _)| w.as_str() < prefix);
        self.folded[start..]
            .iter()
            .take_while(move |(w, _)| w.starts_with(prefix))
            .map(move |(_, i)| &self.words[*i])
    }

    fn bigram_probability(&self, prev: &str, next: &str) -> Option<u8> {
        self.bigrams
            .get(&prev.to_lowercase())?
            .iter()
            .find(|(w, _)| w == next)
            .map(|(_, p)| *p)
    }
}

/// Read-only word list stored in the `LFDX` format, possibly embedded in a
/// larger file at an offset.
pub struct BinaryDictionary {
    kind: DictKind,
    header: DictionaryHeader,
    path: Option<PathBuf>,
    data: RwLock<Option<Loaded>>,
}

impl BinaryDictionary {
    /// Map `path[offset..offset + length]` and decode it.
    pub fn open(path: &Path, offset: u64, length: u64, kind: DictKind) -> Result<Self, DictError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if length == 0 || offset.saturating_add(length) > file_len {
            return Err(DictError::InvalidHeader);
        }
        // SAFETY: The file is opened read-only and the mapping is dropped
        // before this function returns. Dictionary files are replaced by
        // rename, never rewritten in place.
        let mmap = unsafe {
            MmapOptions::new()
                .offset(offset)
                .len(length as usize)
                .map(&file)?
        };
        let mut dict = Self::from_bytes(&mmap, kind)?;
        dict.path = Some(path.to_path_buf());
        Ok(dict)
    }

    pub fn open_file(path: &Path, kind: DictKind) -> Result<Self, DictError> {
        let length = fs::metadata(path)?.len();
        Self::open(path, 0, length, kind)
    }

    pub fn from_bytes(data: &[u8], kind: DictKind) -> Result<Self, DictError> {
        let (header, body_start) = DictionaryHeader::parse(data)?;
        let body: DictionaryBody =
            bincode::deserialize(&data[body_start..]).map_err(DictError::Deserialize)?;
        debug!(
            kind = %kind,
            words = body.words.len(),
            bigrams = body.bigrams.len(),
            "dictionary body decoded"
        );
        Ok(Self {
            kind,
            header,
            path: None,
            data: RwLock::new(Some(Loaded::new(body))),
        })
    }

    pub fn header(&self) -> &DictionaryHeader {
        &self.header
    }

    pub fn locale(&self) -> Option<Locale> {
        self.header.locale()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn word_count(&self) -> usize {
        self.with_data(|d| d.words.len()).unwrap_or(0)
    }

    fn with_data<R>(&self, f: impl FnOnce(&Loaded) -> R) -> Option<R> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(f)
    }
}

/// Whether `a` and `b` are at most one insertion, deletion or substitution
/// apart. Compares code points without allocating.
pub(super) fn within_one_edit(a: &str, b: &str) -> bool {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let (short, long, same_len) = match a_len.abs_diff(b_len) {
        0 => (a, b, true),
        1 if a_len < b_len => (a, b, false),
        1 => (b, a, false),
        _ => return false,
    };
    let mut s = short.chars().peekable();
    let mut l = long.chars().peekable();
    while let (Some(x), Some(y)) = (s.peek(), l.peek()) {
        if x != y {
            break;
        }
        s.next();
        l.next();
    }
    l.next();
    if same_len {
        s.next();
    }
    s.eq(l)
}

impl Dictionary for BinaryDictionary {
    fn kind(&self) -> DictKind {
        self.kind
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.with_data(|d| d.find(word).is_some()).unwrap_or(false)
    }

    fn frequency(&self, word: &str) -> i32 {
        self.with_data(|d| d.find(word).map(|r| i32::from(r.probability)))
            .flatten()
            .unwrap_or(NOT_A_PROBABILITY)
    }

    fn suggestions(
        &self,
        query: &SuggestionQuery<'_>,
        blend_weight: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let weight = query.weight_for_locale;
        if weight <= 0.0 {
            return None;
        }
        if *blend_weight < 0.0 {
            *blend_weight = weight;
        }
        let block = query.settings.block_offensive;
        let prev = query.ngram.nth_prev_word(1);
        let kind = self.kind;

        let mut out = self.with_data(|d| {
            let mut out: Vec<SuggestedWordInfo> = Vec::new();
            let typed = &query.composed.typed_word;
            if typed.is_empty() {
                let Some(nexts) = prev.and_then(|p| d.bigrams.get(&p.to_lowercase())) else {
                    return out;
                };
                for (next, probability) in nexts {
                    let Some(r) = d.find(next) else { continue };
                    if block && r.possibly_offensive {
                        continue;
                    }
                    let mut info = SuggestedWordInfo::new(
                        next,
                        scaled(i32::from(*probability), weight),
                        SuggestionKind::Prediction,
                        kind,
                    );
                    info.possibly_offensive = r.possibly_offensive;
                    out.push(info);
                }
                return out;
            }

            let mut push = |r: &WordRecord, bonus: i32, sk: SuggestionKind| {
                if block && r.possibly_offensive {
                    return;
                }
                let context = prev
                    .and_then(|p| d.bigram_probability(p, &r.word))
                    .map_or(0, i32::from);
                let mut info = SuggestedWordInfo::new(
                    &r.word,
                    scaled(i32::from(r.probability) + context + bonus, weight),
                    sk,
                    kind,
                );
                info.possibly_offensive = r.possibly_offensive;
                out.push(info);
            };

            let folded = typed.to_lowercase();
            for r in d.with_prefix(&folded) {
                if r.word.to_lowercase() == folded {
                    push(r, EXACT_MATCH_BONUS, SuggestionKind::Typed);
                } else {
                    push(r, 0, SuggestionKind::Completion);
                }
            }
            if folded.chars().nth(1).is_some() {
                for (w, i) in &d.folded {
                    // One edit changes the byte length by at most 4.
                    if w.len().abs_diff(folded.len()) > 4 || w.starts_with(&folded) {
                        continue;
                    }
                    if within_one_edit(&folded, w) {
                        let r = &d.words[*i];
                        push(
                            r,
                            -i32::from(r.probability) / 2,
                            SuggestionKind::Correction,
                        );
                    }
                }
            }
            out
        })?;

        if out.is_empty() {
            return None;
        }
        out.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.word.cmp(&b.word)));
        out.truncate(settings().suggestions.per_dictionary_limit);
        Some(out)
    }

    fn next_valid_code_points(&self, composed: &ComposedData) -> Option<Vec<char>> {
        let folded = composed.typed_word.to_lowercase();
        let skip = folded.chars().count();
        let mut points: Vec<char> = self.with_data(|d| {
            d.with_prefix(&folded)
                .filter_map(|r| r.word.to_lowercase().chars().nth(skip))
                .collect()
        })?;
        points.sort_unstable();
        points.dedup();
        (!points.is_empty()).then_some(points)
    }

    fn is_initialized(&self) -> bool {
        self.with_data(|_| ()).is_some()
    }

    fn close(&self) {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!(kind = %self.kind, path = ?self.path, "dictionary closed");
        }
    }
}

/// Writer for the `LFDX` format.
pub struct DictionaryBuilder {
    header: DictionaryHeader,
    words: BTreeMap<String, WordRecord>,
    bigrams: Vec<BigramRecord>,
}

impl DictionaryBuilder {
    pub fn new(locale: &Locale, version: u32) -> Self {
        let id = format!("main:{}", locale.to_string().to_lowercase());
        Self {
            header: DictionaryHeader::new()
                .with_attribute(LOCALE_KEY, &locale.to_string())
                .with_attribute(VERSION_KEY, &version.to_string())
                .with_attribute(DICTIONARY_KEY, &id),
            words: BTreeMap::new(),
            bigrams: Vec::new(),
        }
    }

    /// Start from an explicit header (attributes are written as given).
    pub fn with_header(header: DictionaryHeader) -> Self {
        Self {
            header,
            words: BTreeMap::new(),
            bigrams: Vec::new(),
        }
    }

    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.header = self.header.with_attribute(key, value);
        self
    }

    /// Add a word. A later entry for the same word replaces the earlier one.
    pub fn add_word(&mut self, word: &str, probability: u8, possibly_offensive: bool) -> &mut Self {
        self.words.insert(
            word.to_string(),
            WordRecord {
                word: word.to_string(),
                probability,
                possibly_offensive,
            },
        );
        self
    }

    pub fn add_bigram(&mut self, prev: &str, next: &str, probability: u8) -> &mut Self {
        self.bigrams.push(BigramRecord {
            prev: prev.to_string(),
            next: next.to_string(),
            probability,
        });
        self
    }

    /// Parse a tab-separated word list:
    ///
    /// ```text
    /// # comment
    /// word<TAB>probability[<TAB>offensive]
    /// bigram<TAB>prev<TAB>next<TAB>probability
    /// ```
    pub fn add_word_list(&mut self, text: &str) -> Result<&mut Self, DictError> {
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let parse_prob = |s: &str| {
                s.trim().parse::<u8>().map_err(|_| {
                    DictError::Parse(format!("line {}: bad probability {s:?}", lineno + 1))
                })
            };
            match fields.as_slice() {
                ["bigram", prev, next, prob] => {
                    self.add_bigram(prev, next, parse_prob(prob)?);
                }
                [word, prob] => {
                    self.add_word(word, parse_prob(prob)?, false);
                }
                [word, prob, flag] => {
                    self.add_word(word, parse_prob(prob)?, flag.trim() == "offensive");
                }
                _ => {
                    return Err(DictError::Parse(format!(
                        "line {}: expected word<TAB>probability",
                        lineno + 1
                    )))
                }
            }
        }
        Ok(self)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DictError> {
        let body = DictionaryBody {
            words: self.words.values().cloned().collect(),
            bigrams: self.bigrams.clone(),
        };
        let mut buf = self.header.to_bytes()?;
        buf.extend(bincode::serialize(&body).map_err(DictError::Serialize)?);
        Ok(buf)
    }

    /// Atomic write: write to .tmp then rename.
    pub fn write(&self, path: &Path) -> Result<(), DictError> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
