use std::collections::HashMap;
use std::sync::Arc;

use super::{DictKind, Dictionary, NOT_A_PROBABILITY};
use crate::suggestion::{ComposedData, SuggestedWordInfo, SuggestionQuery};

/// Several dictionary files of one kind presented as a single dictionary.
///
/// Used for the main kind, where a locale may resolve to more than one file.
/// Duplicate suggestions (same word) are deduplicated, keeping the highest
/// score across all members. An empty collection is not initialized.
pub struct DictionaryCollection {
    kind: DictKind,
    members: Vec<Arc<dyn Dictionary>>,
}

impl DictionaryCollection {
    pub fn new(kind: DictKind, members: Vec<Arc<dyn Dictionary>>) -> Self {
        Self { kind, members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Deduplicate suggestions by word, keeping the highest score for each.
fn dedup_suggestions(infos: Vec<SuggestedWordInfo>) -> Vec<SuggestedWordInfo> {
    let mut best: HashMap<String, SuggestedWordInfo> = HashMap::new();
    for info in infos {
        best.entry(info.word.clone())
            .and_modify(|existing| {
                if info.score > existing.score {
                    *existing = info.clone();
                }
            })
            .or_insert(info);
    }
    let mut result: Vec<SuggestedWordInfo> = best.into_values().collect();
    result.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.word.cmp(&b.word)));
    result
}

impl Dictionary for DictionaryCollection {
    fn kind(&self) -> DictKind {
        self.kind
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.members.iter().any(|d| d.is_valid_word(word))
    }

    fn frequency(&self, word: &str) -> i32 {
        self.members
            .iter()
            .map(|d| d.frequency(word))
            .fold(NOT_A_PROBABILITY, i32::max)
    }

    fn suggestions(
        &self,
        query: &SuggestionQuery<'_>,
        blend_weight: &mut f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let mut all = Vec::new();
        for member in &self.members {
            if let Some(infos) = member.suggestions(query, blend_weight) {
                all.extend(infos);
            }
        }
        if all.is_empty() {
            return None;
        }
        Some(dedup_suggestions(all))
    }

    fn next_valid_code_points(&self, composed: &ComposedData) -> Option<Vec<char>> {
        let mut points: Vec<char> = self
            .members
            .iter()
            .filter_map(|d| d.next_valid_code_points(composed))
            .flatten()
            .collect();
        points.sort_unstable();
        points.dedup();
        (!points.is_empty()).then_some(points)
    }

    fn is_initialized(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|d| d.is_initialized())
    }

    fn close(&self) {
        for member in &self.members {
            member.close();
        }
    }
}
