//! Locale identifiers and specificity matching between locale strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `language[_COUNTRY[_variant]]` locale. The empty locale is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locale {
    language: String,
    country: String,
    variant: String,
}

impl Locale {
    pub fn new(language: &str, country: &str, variant: &str) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            country: country.to_ascii_uppercase(),
            variant: variant.to_string(),
        }
    }

    /// The root (unspecified) locale.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.language.is_empty() && self.country.is_empty() && self.variant.is_empty()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Parse `en`, `en_US`, `en-US` or `en_US_POSIX`. Never fails; extra
    /// separators end up in the variant.
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().replace('-', "_");
        let mut parts = normalized.splitn(3, '_');
        let language = parts.next().unwrap_or_default();
        let country = parts.next().unwrap_or_default();
        let variant = parts.next().unwrap_or_default();
        Self::new(language, country, variant)
    }
}

impl FromStr for Locale {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.country.is_empty() || !self.variant.is_empty() {
            write!(f, "_{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "_{}", self.variant)?;
        }
        Ok(())
    }
}

/// How specifically a candidate locale string matches a requested one.
///
/// Only levels at or above [`MatchLevel::LANGUAGE`] count as a match; a
/// more specific candidate (`en_US` for a requested `en`) is not usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchLevel(u8);

impl MatchLevel {
    pub const NONE: Self = Self(0);
    pub const LANGUAGE_COUNTRY_DIFFER: Self = Self(3);
    pub const LANGUAGE_COUNTRY_VARIANT_DIFFER: Self = Self(6);
    pub const ANY: Self = Self(10);
    pub const LANGUAGE: Self = Self(15);
    pub const LANGUAGE_AND_COUNTRY: Self = Self(20);
    pub const FULL: Self = Self(30);

    pub fn is_match(self) -> bool {
        self >= Self::LANGUAGE
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Compute the match level of candidate locale `src` against requested
/// locale `test`. Both are `_`-separated locale strings.
pub fn match_level(src: &str, test: &str) -> MatchLevel {
    if src.is_empty() {
        return if test.is_empty() {
            MatchLevel::FULL
        } else {
            MatchLevel::ANY
        };
    }
    if test.is_empty() {
        return MatchLevel::NONE;
    }
    let src_parts: Vec<&str> = src.splitn(3, '_').collect();
    let test_parts: Vec<&str> = test.splitn(3, '_').collect();
    if src_parts[0] != test_parts[0] {
        return MatchLevel::NONE;
    }
    match src_parts.len() {
        1 => {
            if test_parts.len() == 1 {
                MatchLevel::FULL
            } else {
                MatchLevel::LANGUAGE
            }
        }
        2 => {
            if test_parts.len() == 1 || src_parts[1] != test_parts[1] {
                MatchLevel::LANGUAGE_COUNTRY_DIFFER
            } else if test_parts.len() == 3 {
                MatchLevel::LANGUAGE_AND_COUNTRY
            } else {
                MatchLevel::FULL
            }
        }
        _ => {
            if test_parts.len() == 1 || src_parts[1] != test_parts[1] {
                MatchLevel::LANGUAGE_COUNTRY_DIFFER
            } else if test_parts.len() == 2 || src_parts[2] != test_parts[2] {
                MatchLevel::LANGUAGE_COUNTRY_VARIANT_DIFFER
            } else {
                MatchLevel::FULL
            }
        }
    }
}
