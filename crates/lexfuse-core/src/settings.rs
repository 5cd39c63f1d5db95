//! Global tuning settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub weights: WeightSettings,
    pub suggestions: SuggestionLimits,
    pub history: HistorySettings,
    pub dict_files: DictFileSettings,
    pub loader: LoaderSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightSettings {
    pub most_probable: f32,
    pub typing_secondary: f32,
    pub gesturing_secondary: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionLimits {
    pub max_suggestions: usize,
    pub per_dictionary_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    pub capitalized_form_max_probability_for_insert: i32,
    pub half_life_hours: f64,
    pub max_unigrams: usize,
    pub max_bigrams: usize,
    pub wal_compact_threshold: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictFileSettings {
    pub check_version: bool,
    pub min_dictionary_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderSettings {
    pub wait_timeout_ms: u64,
}

impl LoaderSettings {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub valid_spelling_cache_size: usize,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_unit_weight {
        ($section:ident . $field:ident) => {
            if !(0.0..=1.0).contains(&s.$section.$field) {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be within 0.0..=1.0".to_string(),
                });
            }
        };
    }
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_unit_weight!(weights.most_probable);
    check_unit_weight!(weights.typing_secondary);
    check_unit_weight!(weights.gesturing_secondary);
    if s.weights.typing_secondary > s.weights.most_probable
        || s.weights.gesturing_secondary > s.weights.most_probable
    {
        return Err(SettingsError::InvalidValue {
            field: "weights".to_string(),
            reason: "secondary weights must not exceed most_probable".to_string(),
        });
    }

    check_positive_usize!(suggestions.max_suggestions);
    check_positive_usize!(suggestions.per_dictionary_limit);

    if !(0..=255).contains(&s.history.capitalized_form_max_probability_for_insert) {
        return Err(SettingsError::InvalidValue {
            field: "history.capitalized_form_max_probability_for_insert".to_string(),
            reason: "must be within 0..=255".to_string(),
        });
    }
    if s.history.half_life_hours <= 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "history.half_life_hours".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    check_positive_usize!(history.max_unigrams);
    check_positive_usize!(history.max_bigrams);
    check_positive_usize!(history.wal_compact_threshold);

    check_positive_usize!(cache.valid_spelling_cache_size);

    Ok(())
}
