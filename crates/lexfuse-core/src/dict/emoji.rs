use std::sync::atomic::{AtomicBool, Ordering};

use super::{DictKind, Dictionary, NOT_A_PROBABILITY};
use crate::locale::Locale;
use crate::suggestion::{SuggestedWordInfo, SuggestionKind, SuggestionQuery};

/// Base score of an emoji candidate before the locale weight is applied.
const EMOJI_SCORE: f32 = 50.0;

/// Keyword → emoji, by language.
static KEYWORDS_EN: &[(&str, &[&str])] = &[
    ("cat", &["🐱", "🐈"]),
    ("coffee", &["☕"]),
    ("dog", &["🐶", "🐕"]),
    ("fire", &["🔥"]),
    ("happy", &["😊", "😀"]),
    ("heart", &["❤️"]),
    ("laugh", &["😂"]),
    ("love", &["❤️", "😍"]),
    ("ok", &["👌"]),
    ("party", &["🎉"]),
    ("sad", &["😢"]),
    ("smile", &["🙂", "😄"]),
    ("sun", &["☀️"]),
    ("thanks", &["🙏"]),
    ("yes", &["👍"]),
];

static KEYWORDS_FR: &[(&str, &[&str])] = &[
    ("amour", &["❤️", "😍"]),
    ("chat", &["🐱"]),
    ("chien", &["🐶"]),
    ("content", &["😊"]),
    ("feu", &["🔥"]),
    ("merci", &["🙏"]),
    ("triste", &["😢"]),
];

static KEYWORDS_DE: &[(&str, &[&str])] = &[
    ("danke", &["🙏"]),
    ("feuer", &["🔥"]),
    ("hund", &["🐶"]),
    ("katze", &["🐱"]),
    ("liebe", &["❤️", "😍"]),
    ("traurig", &["😢"]),
];

fn keywords_for(locale: &Locale) -> &'static [(&'static str, &'static [&'static str])] {
    match locale.language() {
        "en" => KEYWORDS_EN,
        "fr" => KEYWORDS_FR,
        "de" => KEYWORDS_DE,
        _ => &[],
    }
}

/// Suggests emoji for keywords typed in the group's language.
pub struct EmojiDictionary {
    keywords: &'static [(&'static str, &'static [&'static str])],
    closed: AtomicBool,
}

impl EmojiDictionary {
    pub fn new(locale: &Locale) -> Self {
        Self {
            keywords: keywords_for(locale),
            closed: AtomicBool::new(false),
        }
    }

    fn lookup(&self, word: &str) -> Option<&'static [&'static str]> {
        if self.closed.load(Ordering::Relaxed) {
            return None;
        }
        let folded = word.to_lowercase();
        self.keywords
            .binary_search_by(|(k, _)| (*k).cmp(folded.as_str()))
            .ok()
            .map(|i| self.keywords[i].1)
    }
}

impl Dictionary for EmojiDictionary {
    fn kind(&self) -> DictKind {
        DictKind::Emoji
    }

    /// Keywords are not words of the language.
    fn is_valid_word(&self, _word: &str) -> bool {
        false
    }

    fn frequency(&self, _word: &str) -> i32 {
        NOT_A_PROBABILITY
    }

    fn suggestions(
        &self,
        query: &SuggestionQuery<'_>,
        _blend_weight: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        if query.weight_for_locale <= 0.0 || query.composed.is_batch_mode {
            return None;
        }
        let emoji = self.lookup(&query.composed.typed_word)?;
        let score = (EMOJI_SCORE * query.weight_for_locale).round() as i32;
        Some(
            emoji
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    SuggestedWordInfo::new(e, score - i as i32, SuggestionKind::Emoji, DictKind::Emoji)
                })
                .collect(),
        )
    }

    fn is_initialized(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}
