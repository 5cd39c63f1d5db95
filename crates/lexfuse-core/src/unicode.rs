//! Word splitting and case helpers for committed text.

/// Split committed text into words. Runs of whitespace separate words and
/// never produce empty entries.
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// `HELLO` → `Hello`, `hELLO` → `Hello`.
pub fn capitalize_first_and_downcase_rest(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Whether the first character is upper case.
pub fn starts_with_upper(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// Number of Unicode scalar values, used as the word length for ranking.
pub fn code_point_count(word: &str) -> usize {
    word.chars().count()
}
