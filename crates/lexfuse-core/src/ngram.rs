//! Previous-word context for n-gram lookups.

/// Maximum number of previous words carried in a context.
pub const MAX_PREV_WORD_COUNT: usize = 3;

/// A previous word, or the beginning-of-sentence marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WordInfo {
    Word(String),
    BeginningOfSentence,
}

impl WordInfo {
    pub fn new(word: &str) -> Self {
        Self::Word(word.to_string())
    }

    pub fn word(&self) -> Option<&str> {
        match self {
            Self::Word(w) => Some(w),
            Self::BeginningOfSentence => None,
        }
    }
}

/// Previous words, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NgramContext {
    prev: Vec<WordInfo>,
}

impl NgramContext {
    /// Context with no information about previous words.
    pub fn empty() -> Self {
        Self { prev: Vec::new() }
    }

    pub fn beginning_of_sentence() -> Self {
        Self {
            prev: vec![WordInfo::BeginningOfSentence],
        }
    }

    /// Build from previous words, most recent first. Extra words beyond
    /// [`MAX_PREV_WORD_COUNT`] are dropped.
    pub fn new(prev: impl IntoIterator<Item = WordInfo>) -> Self {
        let mut prev: Vec<WordInfo> = prev.into_iter().collect();
        prev.truncate(MAX_PREV_WORD_COUNT);
        Self { prev }
    }

    /// The context that follows committing `word` after this one.
    pub fn next_ngram_context(&self, word: WordInfo) -> Self {
        let mut prev = Vec::with_capacity(MAX_PREV_WORD_COUNT);
        prev.push(word);
        prev.extend(self.prev.iter().take(MAX_PREV_WORD_COUNT - 1).cloned());
        Self { prev }
    }

    pub fn is_beginning_of_sentence_context(&self) -> bool {
        matches!(self.prev.first(), Some(WordInfo::BeginningOfSentence))
    }

    /// The n-th previous word (1-based), if it is a real word.
    pub fn nth_prev_word(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.prev.get(i))
            .and_then(WordInfo::word)
    }

    pub fn prev_word_count(&self) -> usize {
        self.prev.len()
    }

    pub fn is_valid(&self) -> bool {
        !self.prev.is_empty()
    }
}

impl Default for NgramContext {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_context_shifts_window() {
        let ctx = NgramContext::beginning_of_sentence();
        assert!(ctx.is_beginning_of_sentence_context());
        let ctx = ctx.next_ngram_context(WordInfo::new("the"));
        assert!(!ctx.is_beginning_of_sentence_context());
        assert_eq!(ctx.nth_prev_word(1), Some("the"));
        assert_eq!(ctx.nth_prev_word(2), None);
        assert_eq!(ctx.prev_word_count(), 2);
    }

    #[test]
    fn window_is_bounded() {
        let mut ctx = NgramContext::empty();
        for w in ["a", "b", "c", "d", "e"] {
            ctx = ctx.next_ngram_context(WordInfo::new(w));
        }
        assert_eq!(ctx.prev_word_count(), MAX_PREV_WORD_COUNT);
        assert_eq!(ctx.nth_prev_word(1), Some("e"));
        assert_eq!(ctx.nth_prev_word(3), Some("c"));
        assert_eq!(ctx.nth_prev_word(0), None);
    }

    #[test]
    fn new_truncates() {
        let ctx = NgramContext::new((0..5).map(|i| WordInfo::new(&i.to_string())));
        assert_eq!(ctx.prev_word_count(), MAX_PREV_WORD_COUNT);
        assert!(!NgramContext::empty().is_valid());
    }
}
