//! Locating dictionary files for a locale.
//!
//! Downloaded word lists live under `<files_dir>/dicts/<locale dir>/<file>`.
//! Both directory and file names are escaped word-list ids: `category:locale`,
//! with every character outside `[0-9A-Za-z_]` written as `%` plus six hex
//! digits.


use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::context::ImeContext;
use crate::dict::DictionaryHeader;
use crate::locale::{self, Locale, MatchLevel};
use crate::prefs::PreferenceStore;
use crate::settings::settings;

pub const MAIN_DICTIONARY_CATEGORY: &str = "main";
pub const ID_CATEGORY_SEPARATOR: char = ':';
/// Unicode is limited to 21 bits.
const MAX_HEX_DIGITS_FOR_CODEPOINT: usize = 6;

/// A dictionary stored at `offset..offset + length` inside `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFileAddress {
    pub path: PathBuf,
    pub offset: u64,
    pub length: u64,
    /// Shipped with the application rather than downloaded.
    pub bundled: bool,
}

impl AssetFileAddress {
    pub fn new(path: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            length,
            bundled: false,
        }
    }

    /// The whole of a regular, readable file.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        File::open(path)?;
        Ok(Self::new(path, 0, meta.len()))
    }

    pub fn into_bundled(mut self) -> Self {
        self.bundled = true;
        self
    }
}

fn is_file_name_character(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Escape every character that may be unsafe in a file name.
pub fn replace_file_name_dangerous_characters(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if is_file_name_character(c) {
            out.push(c);
        } else {
            out.push_str(&format!(
                "%{:0width$x}",
                u32::from(c),
                width = MAX_HEX_DIGITS_FOR_CODEPOINT
            ));
        }
    }
    out
}

/// Reverse of [`replace_file_name_dangerous_characters`]. A malformed escape
/// is kept verbatim.
pub fn word_list_id_from_file_name(file_name: &str) -> String {
    let mut out = String::with_capacity(file_name.len());
    let mut rest = file_name;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest[pos + 1..].get(..MAX_HEX_DIGITS_FOR_CODEPOINT);
        let decoded = escape
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[pos + 1 + MAX_HEX_DIGITS_FOR_CODEPOINT..];
            }
            None => {
                out.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Split a word-list id into exactly two `:`-separated parts.
fn split_id(id: &str) -> Option<(&str, &str)> {
    let mut parts: Vec<&str> = id.split(ID_CATEGORY_SEPARATOR).collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    match parts.as_slice() {
        [category, locale] => Some((category, locale)),
        _ => None,
    }
}

/// The category of a word-list file, or `None` if the name is not a
/// `category:locale` id.
pub fn category_from_file_name(file_name: &str) -> Option<String> {
    let id = word_list_id_from_file_name(file_name);
    split_id(&id).map(|(category, _)| category.to_string())
}

pub fn is_main_word_list_id(id: &str) -> bool {
    split_id(id).is_some_and(|(category, _)| category == MAIN_DICTIONARY_CATEGORY)
}

/// Id of the main word list for `locale`: `main:` plus the lower-cased locale.
pub fn main_dict_id(locale: &Locale) -> String {
    format!(
        "{MAIN_DICTIONARY_CATEGORY}{ID_CATEGORY_SEPARATOR}{}",
        locale.to_string().to_lowercase()
    )
}

/// Which word lists the user enabled.
pub struct DictPackSettings<'a> {
    store: Option<&'a dyn PreferenceStore>,
}

impl<'a> DictPackSettings<'a> {
    pub fn new(ctx: &'a ImeContext) -> Self {
        Self {
            store: ctx.preferences(),
        }
    }

    /// Word lists with no stored setting are active.
    pub fn is_word_list_active(&self, id: &str) -> bool {
        self.store
            .and_then(|s| s.get_bool(id))
            .unwrap_or(true)
    }
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Downloaded word lists usable for `locale`, one per category. When several
/// locale directories match, each category keeps the file from the closest
/// match.
pub fn get_cached_word_lists(locale: &str, ctx: &ImeContext) -> Vec<PathBuf> {
    let mut best: BTreeMap<Option<String>, (PathBuf, MatchLevel)> = BTreeMap::new();
    for dir in sorted_entries(&ctx.dicts_dir()) {
        if !dir.is_dir() {
            continue;
        }
        let dir_locale = word_list_id_from_file_name(file_name(&dir));
        let level = locale::match_level(&dir_locale, locale);
        if !level.is_match() {
            continue;
        }
        for word_list in sorted_entries(&dir) {
            let category = category_from_file_name(file_name(&word_list));
            let replace = best
                .get(&category)
                .map_or(true, |(_, current)| *current < level);
            if replace {
                best.insert(category, (word_list, level));
            }
        }
    }
    best.into_values().map(|(path, _)| path).collect()
}

/// Whether a dictionary file is recent enough to be used. Any failure to
/// read the header or its `version` attribute makes the file unusable.
pub fn can_use_dictionary_file(path: &Path) -> bool {
    let config = &settings().dict_files;
    if !config.check_version {
        return true;
    }
    match DictionaryHeader::read_file(path).and_then(|h| h.version()) {
        Ok(version) => version >= config.min_dictionary_version,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "dictionary header unusable");
            false
        }
    }
}

/// Files making up the main dictionary for `locale`: usable downloaded word
/// lists first, then the bundled dictionary if no downloaded main list was
/// usable, then (if `fallback`) the generic fallback dictionary.
pub fn get_dictionary_files(
    locale: &Locale,
    ctx: &ImeContext,
    fallback: bool,
) -> Vec<AssetFileAddress> {
    let cached = get_cached_word_lists(&locale.to_string(), ctx);
    let main_id = main_dict_id(locale);
    let pack = DictPackSettings::new(ctx);

    let mut found_main = false;
    let mut files = Vec::new();
    for path in cached {
        let id = word_list_id_from_file_name(file_name(&path));
        let can_use = File::open(&path).is_ok() && can_use_dictionary_file(&path);
        if can_use && is_main_word_list_id(&id) {
            found_main = true;
        }
        if !pack.is_word_list_active(&id) {
            continue;
        }
        if can_use {
            if let Ok(address) = AssetFileAddress::from_file(&path) {
                files.push(address);
            }
        } else {
            error!(
                locale = %locale,
                path = %path.display(),
                "found a cached dictionary file but cannot read or use it"
            );
        }
    }

    if !found_main && pack.is_word_list_active(&main_id) {
        let bundled = ctx.bundled();
        let asset = bundled.and_then(|b| b.dictionary_for(locale)).or_else(|| {
            if fallback {
                bundled.and_then(|b| b.fallback())
            } else {
                None
            }
        });
        if let Some(asset) = asset {
            files.push(asset);
        }
    }
    files
}
