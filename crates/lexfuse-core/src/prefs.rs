//! Word-list enablement preferences.
//!
//! A missing store or a missing key means "enabled".

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("preference {key} is not a boolean")]
    NotABoolean { key: String },
}

pub trait PreferenceStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Option<bool>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, bool>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }
}

/// Flat TOML table of booleans, read once.
///
/// ```toml
/// "main:en_us" = true
/// "main:fr" = false
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlPreferenceStore {
    values: HashMap<String, bool>,
}

impl TomlPreferenceStore {
    pub fn parse(content: &str) -> Result<Self, PreferenceError> {
        let table: toml::Table = content.parse()?;
        let mut values = HashMap::with_capacity(table.len());
        for (key, value) in table {
            let b = value
                .as_bool()
                .ok_or_else(|| PreferenceError::NotABoolean { key: key.clone() })?;
            values.insert(key, b);
        }
        Ok(Self { values })
    }

    pub fn open(path: &Path) -> Result<Self, PreferenceError> {
        Self::parse(&fs::read_to_string(path)?)
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }
}
