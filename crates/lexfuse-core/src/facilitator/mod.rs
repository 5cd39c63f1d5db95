//! Multi-locale dictionary facilitation.
//!
//! [`DictionaryFacilitator`] owns one [`DictionaryGroup`] per active locale,
//! keeps the group list in sync with the enabled locales, routes commit,
//! suggestion and validity queries to the groups, and tracks which locale
//! the user is most likely typing in.
//!
//! The group list is an immutable snapshot replaced under a write lock.
//! Readers clone the snapshot and query dictionaries without holding the
//! lock. Main dictionaries load on the `lexfuse-loader` thread and are
//! installed only if their target group is still published.

mod cache;
mod group;
mod loader;
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, debug_span};

pub use cache::ValidSpellingWordCache;
pub use group::DictionaryGroup;
pub use loader::Latch;

use loader::{DictionaryLoader, LoaderWork, MainLoadJob};

use crate::context::ImeContext;
use crate::dict::{
    DictError, DictKind, Dictionary, DictionaryFactory, DictionaryStats, EmojiDictionary,
    ExpandableDictionary, SubDictParams, NOT_A_PROBABILITY,
    NOT_A_WEIGHT_OF_LANG_MODEL_VS_SPATIAL_MODEL,
};
use crate::locale::Locale;
use crate::ngram::{NgramContext, WordInfo};
use crate::settings::settings;
use crate::suggestion::{
    ComposedData, InputStyle, ProximityInfo, SuggestionQuery, SuggestionResults,
    SuggestionSettings,
};
use crate::unicode::{capitalize_first_and_downcase_rest, split_words};

type Groups = Arc<[Arc<DictionaryGroup>]>;

/// Told whether any main dictionary is usable, after every reset and after
/// every background load.
pub trait DictionaryInitializationListener: Send + Sync {
    fn on_update_main_dictionary_availability(&self, is_main_dictionary_available: bool);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryOptions {
    /// Contacts are used only if the context also grants permission.
    pub use_contacts: bool,
    /// Learn from typing into a user-history dictionary.
    pub use_personalized: bool,
    /// Rebuild every handle instead of reusing existing ones.
    pub force_reload_all: bool,
    pub account: Option<String>,
    /// Prepended to default sub-dictionary file names.
    pub name_prefix: String,
}

/// What caused a word to be unlearned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Input,
    Backspace,
    Rejection,
    Revert,
}

/// State shared with the loader thread.
pub(crate) struct Shared {
    factory: DictionaryFactory,
    groups: RwLock<Groups>,
}

impl Shared {
    fn groups(&self) -> Groups {
        Arc::clone(&self.groups.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in `groups` and return the previous list.
    fn replace_groups(&self, groups: Groups) -> Groups {
        let mut published = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *published, groups)
    }

    /// Install a freshly loaded main dictionary, or close it if `group` was
    /// replaced or changed locale while it loaded.
    pub(crate) fn install_main(
        &self,
        group: &Arc<DictionaryGroup>,
        locale: &Locale,
        dict: Arc<dyn Dictionary>,
    ) {
        let published = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let current = published.iter().any(|g| Arc::ptr_eq(g, group));
        if current && group.locale() == Some(locale) {
            debug!(locale = %locale, initialized = dict.is_initialized(), "main dictionary installed");
            group.set_main_dict(Some(dict));
        } else {
            debug!(locale = %locale, "discarding main dictionary loaded for a stale group");
            dict.close();
        }
    }

    pub(crate) fn has_at_least_one_initialized_main_dictionary(&self) -> bool {
        self.groups().iter().any(|g| g.is_main_initialized())
    }
}

pub struct DictionaryFacilitator {
    shared: Arc<Shared>,
    loader: DictionaryLoader,
    /// Held for the whole build, publish and cleanup of a reset.
    reset_lock: Mutex<()>,
    pending_main_dict_load: Mutex<Arc<Latch>>,
    read_cache: RwLock<Option<Arc<ValidSpellingWordCache>>>,
    write_cache: RwLock<Option<Arc<ValidSpellingWordCache>>>,
}

impl DictionaryFacilitator {
    /// A facilitator with a single locale-less group and no dictionaries.
    pub fn new(factory: DictionaryFactory) -> Self {
        Self {
            shared: Arc::new(Shared {
                factory,
                groups: RwLock::new(empty_groups()),
            }),
            loader: DictionaryLoader::spawn(),
            reset_lock: Mutex::new(()),
            pending_main_dict_load: Mutex::new(Arc::new(Latch::new(0))),
            read_cache: RwLock::new(None),
            write_cache: RwLock::new(None),
        }
    }

    /// Current group snapshot. Index 0 is the primary locale.
    pub fn dictionary_groups(&self) -> Groups {
        self.shared.groups()
    }

    fn lock_resets(&self) -> MutexGuard<'_, ()> {
        self.reset_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_latch(&self) -> MutexGuard<'_, Arc<Latch>> {
        self.pending_main_dict_load
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Locale and account queries
    // -----------------------------------------------------------------------

    /// Whether the groups serve exactly `locales`, in any order.
    pub fn is_for_locales(&self, locales: &[Locale]) -> bool {
        let groups = self.shared.groups();
        locales.len() == groups.len()
            && locales
                .iter()
                .all(|l| groups.iter().any(|g| g.locale() == Some(l)))
    }

    pub fn is_for_locale(&self, locale: &Locale) -> bool {
        self.shared
            .groups()
            .first()
            .is_some_and(|g| g.locale() == Some(locale))
    }

    pub fn is_for_account(&self, account: Option<&str>) -> bool {
        self.shared
            .groups()
            .first()
            .is_some_and(|g| g.account() == account)
    }

    /// Whether a locale is active.
    pub fn is_active(&self) -> bool {
        self.shared
            .groups()
            .first()
            .is_some_and(|g| g.locale().is_some())
    }

    pub fn locales(&self) -> Vec<Locale> {
        self.shared
            .groups()
            .iter()
            .filter_map(|g| g.locale().cloned())
            .collect()
    }

    /// Locale of the first group, or the root locale.
    pub fn primary_locale(&self) -> Locale {
        self.shared
            .groups()
            .first()
            .and_then(|g| g.locale().cloned())
            .unwrap_or_else(Locale::root)
    }

    pub fn uses_contacts(&self) -> bool {
        self.shared
            .groups()
            .first()
            .is_some_and(|g| g.sub_dict(DictKind::Contacts).is_some())
    }

    // -----------------------------------------------------------------------
    // Reset and teardown
    // -----------------------------------------------------------------------

    /// Bring the groups in line with `new_locales`, reusing every handle
    /// that still fits and closing the rest once the new list is published.
    /// Missing main dictionaries are loaded in the background.
    pub fn reset_dictionaries(
        &self,
        ctx: &ImeContext,
        new_locales: &[Locale],
        options: &DictionaryOptions,
        listener: Option<Arc<dyn DictionaryInitializationListener>>,
    ) {
        let _span = debug_span!("reset_dictionaries", locales = ?new_locales).entered();
        let _reset = self.lock_resets();
        let account = options.account.as_deref();
        let old_groups = self.shared.groups();

        let mut sub_kinds = vec![DictKind::User];
        if options.use_contacts && ctx.contacts_permission_granted() {
            sub_kinds.push(DictKind::Contacts);
        }
        if options.use_personalized {
            sub_kinds.push(DictKind::UserHistory);
        }

        let mut new_groups = Vec::with_capacity(new_locales.len());
        // Old group whose main dictionary each new group takes over.
        let mut main_sources = Vec::with_capacity(new_locales.len());
        for locale in new_locales {
            let existing = old_groups
                .iter()
                .position(|g| g.locale() == Some(locale))
                .filter(|_| !options.force_reload_all);
            let reusable = |kind: DictKind| existing.filter(|&i| old_groups[i].has_dict(kind, account));
            main_sources.push(existing);

            let emoji = match reusable(DictKind::Emoji) {
                Some(i) => old_groups[i].emoji_dict(),
                None => Some(Arc::new(EmojiDictionary::new(locale)) as Arc<dyn Dictionary>),
            };

            let mut subs = HashMap::new();
            for &kind in &sub_kinds {
                let handle = match reusable(kind) {
                    Some(i) => old_groups[i].sub_dict(kind).cloned(),
                    None => self.shared.factory.create_sub(
                        kind,
                        &SubDictParams {
                            ctx,
                            locale,
                            dict_file: None,
                            name_prefix: &options.name_prefix,
                            account,
                        },
                    ),
                };
                if let Some(handle) = handle {
                    subs.insert(kind, handle);
                }
            }
            new_groups.push(Arc::new(DictionaryGroup::new(
                Some(locale.clone()),
                None,
                emoji,
                options.account.clone(),
                subs,
            )));
        }
        let new_groups: Groups = new_groups.into();

        // Main handles are taken over under the write lock: a load installed
        // into an old group while this reset was building is reused, not
        // loaded again.
        let (to_load, latch) = {
            let mut published = self.shared.groups.write().unwrap_or_else(PoisonError::into_inner);
            for (group, &source) in new_groups.iter().zip(&main_sources) {
                if let Some(main) = source.and_then(|i| old_groups[i].main_dict()) {
                    group.set_main_dict(Some(main));
                }
            }
            let to_load: Vec<Arc<DictionaryGroup>> = new_groups
                .iter()
                .filter(|g| !g.is_main_initialized())
                .cloned()
                .collect();
            let latch = Arc::new(Latch::new(to_load.len()));
            *published = Arc::clone(&new_groups);
            *self.pending_latch() = Arc::clone(&latch);
            (to_load, latch)
        };
        for group in to_load {
            let Some(locale) = group.locale().cloned() else {
                latch.count_down();
                continue;
            };
            self.loader.submit(LoaderWork::LoadMain(MainLoadJob {
                shared: Arc::clone(&self.shared),
                ctx: ctx.clone(),
                group,
                locale,
                listener: listener.clone(),
                latch: Arc::clone(&latch),
            }));
        }

        if let Some(listener) = &listener {
            listener.on_update_main_dictionary_availability(
                self.has_at_least_one_initialized_main_dictionary(),
            );
        }

        for old in old_groups.iter() {
            for kind in old.kinds() {
                close_if_unused(old, kind, &new_groups);
            }
        }

        if let Some(cache) = self.write_cache() {
            cache.evict_all();
        }
    }

    /// Install a single group synchronously with exactly `kinds`. Sub
    /// dictionaries use the file given in `files` for their kind, if any.
    pub fn reset_dictionaries_for_testing(
        &self,
        ctx: &ImeContext,
        locale: &Locale,
        kinds: &[DictKind],
        files: &HashMap<DictKind, PathBuf>,
        account: Option<&str>,
    ) -> Result<(), DictError> {
        let _reset = self.lock_resets();
        let mut main = None;
        let mut emoji = None;
        let mut subs: HashMap<DictKind, Arc<dyn ExpandableDictionary>> = HashMap::new();
        for &kind in kinds {
            match kind {
                DictKind::Main => main = Some(self.shared.factory.load_main(ctx, locale)),
                DictKind::Emoji => {
                    emoji = Some(Arc::new(EmojiDictionary::new(locale)) as Arc<dyn Dictionary>)
                }
                _ => {
                    let params = SubDictParams {
                        ctx,
                        locale,
                        dict_file: files.get(&kind).map(PathBuf::as_path),
                        name_prefix: "",
                        account,
                    };
                    match self.shared.factory.try_create_sub(kind, &params) {
                        Ok(dict) => {
                            subs.insert(kind, dict);
                        }
                        Err(e) => {
                            let built = DictionaryGroup::new(None, main, emoji, None, subs);
                            built.close_all();
                            return Err(e);
                        }
                    }
                }
            }
        }
        let group = Arc::new(DictionaryGroup::new(
            Some(locale.clone()),
            main,
            emoji,
            account.map(str::to_string),
            subs,
        ));
        let new_groups: Groups = vec![group].into();
        let old_groups = self.shared.replace_groups(Arc::clone(&new_groups));
        *self.pending_latch() = Arc::new(Latch::new(0));
        for old in old_groups.iter() {
            for kind in old.kinds() {
                close_if_unused(old, kind, &new_groups);
            }
        }
        Ok(())
    }

    /// Unpublish every group and close all of their handles.
    pub fn close_dictionaries(&self) {
        let _reset = self.lock_resets();
        let old_groups = self.shared.replace_groups(empty_groups());
        for group in old_groups.iter() {
            group.close_all();
        }
        debug!(groups = old_groups.len(), "dictionaries closed");
    }

    // -----------------------------------------------------------------------
    // Main dictionary loading
    // -----------------------------------------------------------------------

    pub fn has_at_least_one_initialized_main_dictionary(&self) -> bool {
        self.shared.has_at_least_one_initialized_main_dictionary()
    }

    pub fn has_at_least_one_uninitialized_main_dictionary(&self) -> bool {
        self.shared
            .groups()
            .iter()
            .any(|g| !g.is_main_initialized())
    }

    /// Wait for the loads scheduled by the latest reset. Returns `false` on
    /// timeout.
    pub fn wait_for_loading_main_dictionaries(&self, timeout: Duration) -> bool {
        let latch = Arc::clone(&self.pending_latch());
        latch.wait_timeout(timeout)
    }

    /// Wait for main dictionary loads and then for every other queued
    /// loader task.
    pub fn wait_for_loading_dictionaries_for_testing(&self, timeout: Duration) -> bool {
        if !self.wait_for_loading_main_dictionaries(timeout) {
            return false;
        }
        let barrier = Arc::new(Latch::new(1));
        self.loader.submit(LoaderWork::Barrier(Arc::clone(&barrier)));
        barrier.wait_timeout(timeout)
    }

    // -----------------------------------------------------------------------
    // Confidence
    // -----------------------------------------------------------------------

    /// Update per-group confidence from committed text. For each word, the
    /// groups that know it gain one point and, if any group knew it, every
    /// other group drops back to zero.
    pub fn on_word_committed(&self, text: &str) {
        let groups = self.shared.groups();
        for word in split_words(text) {
            let recognized: Vec<bool> = groups
                .iter()
                .map(|g| {
                    g.locale().is_some() && g.handles().iter().any(|h| h.is_valid_word(word))
                })
                .collect();
            if !recognized.contains(&true) {
                continue;
            }
            for (group, known) in groups.iter().zip(recognized) {
                if known {
                    group.increase_confidence();
                } else {
                    group.reset_confidence();
                }
            }
        }
    }

    /// Locale of the first group holding the highest confidence, or the
    /// root locale if no group has a locale.
    pub fn get_most_confident_locale(&self) -> Locale {
        most_confident_group(&self.shared.groups())
            .and_then(|g| g.locale().cloned())
            .unwrap_or_else(Locale::root)
    }

    // -----------------------------------------------------------------------
    // Suggestions
    // -----------------------------------------------------------------------

    /// Query every dictionary of every group and fuse the candidates.
    pub fn get_suggestion_results(
        &self,
        composed: &ComposedData,
        ngram: &NgramContext,
        proximity: &ProximityInfo,
        suggestion_settings: &SuggestionSettings,
        session_id: i32,
        input_style: InputStyle,
    ) -> SuggestionResults {
        let _span =
            debug_span!("get_suggestion_results", session_id, input_style = ?input_style).entered();
        let groups = self.shared.groups();
        update_weights(&groups);
        let mut results = SuggestionResults::new(
            settings().suggestions.max_suggestions,
            ngram.is_beginning_of_sentence_context(),
            suggestion_settings.debug_raw_suggestions,
        );
        let mut blend_weight = NOT_A_WEIGHT_OF_LANG_MODEL_VS_SPATIAL_MODEL;
        for group in groups.iter() {
            let query = SuggestionQuery {
                composed,
                ngram,
                proximity,
                settings: suggestion_settings,
                session_id,
                weight_for_locale: group.weight_for(composed.is_batch_mode),
            };
            for handle in group.handles() {
                let Some(infos) = handle.suggestions(&query, &mut blend_weight) else {
                    continue;
                };
                if let Some(raw) = results.raw_suggestions.as_mut() {
                    raw.extend(infos.iter().cloned());
                }
                results.add_all(infos);
            }
        }
        results
    }

    /// Characters that can follow the composed input in any dictionary.
    pub fn get_valid_next_code_points(&self, composed: &ComposedData) -> Vec<char> {
        let mut points: Vec<char> = self
            .shared
            .groups()
            .iter()
            .flat_map(|g| g.handles())
            .filter_map(|h| h.next_valid_code_points(composed))
            .flatten()
            .collect();
        points.sort_unstable();
        points.dedup();
        points
    }

    // -----------------------------------------------------------------------
    // Validity and frequency
    // -----------------------------------------------------------------------

    pub fn set_valid_spelling_word_read_cache(&self, cache: Option<Arc<ValidSpellingWordCache>>) {
        *self.read_cache.write().unwrap_or_else(PoisonError::into_inner) = cache;
    }

    pub fn set_valid_spelling_word_write_cache(&self, cache: Option<Arc<ValidSpellingWordCache>>) {
        *self.write_cache.write().unwrap_or_else(PoisonError::into_inner) = cache;
    }

    fn read_cache(&self) -> Option<Arc<ValidSpellingWordCache>> {
        self.read_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_cache(&self) -> Option<Arc<ValidSpellingWordCache>> {
        self.write_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_valid_spelling_word(&self, word: &str) -> bool {
        if let Some(valid) = self.read_cache().and_then(|c| c.get(word)) {
            return valid;
        }
        self.is_valid_word(word)
    }

    pub fn is_valid_suggestion_word(&self, word: &str) -> bool {
        self.is_valid_word(word)
    }

    fn is_valid_word(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        self.shared.groups().iter().any(|g| {
            g.locale().is_some() && g.handles().iter().any(|h| h.is_valid_word(word))
        })
    }

    /// Highest frequency of `word` in any dictionary, or
    /// [`NOT_A_PROBABILITY`].
    pub fn get_frequency(&self, word: &str) -> i32 {
        self.shared
            .groups()
            .iter()
            .map(|g| group_frequency(g, word))
            .fold(NOT_A_PROBABILITY, i32::max)
    }

    /// Record the lower-cased and capitalized forms of `word` in the write
    /// cache with their current validity.
    fn put_word_into_valid_spelling_word_cache(&self, word: &str) {
        let Some(cache) = self.write_cache() else {
            return;
        };
        let lower = word.to_lowercase();
        let lower_valid = self.is_valid_spelling_word(&lower);
        cache.put(lower, lower_valid);
        let capitalized = capitalize_first_and_downcase_rest(word);
        let capitalized_valid = lower_valid || self.is_valid_spelling_word(&capitalized);
        cache.put(capitalized, capitalized_valid);
    }

    // -----------------------------------------------------------------------
    // Learning
    // -----------------------------------------------------------------------

    /// Learn committed text into the user history of the most confident
    /// locale. Nothing is learned while no locale has any confidence.
    pub fn add_to_user_history(
        &self,
        text: &str,
        was_auto_capitalized: bool,
        ngram: &NgramContext,
        timestamp: u64,
        block_offensive: bool,
    ) {
        self.put_word_into_valid_spelling_word_cache(text);

        let groups = self.shared.groups();
        let Some(group) = most_confident_group(&groups) else {
            return;
        };
        if group.confidence() == 0 {
            debug!(locale = ?group.locale(), "not confident about any locale, not learning");
            return;
        }
        let Some(history) = group.sub_dict(DictKind::UserHistory) else {
            return;
        };
        let mut ngram = ngram.clone();
        for (i, word) in split_words(text).enumerate() {
            self.add_word_to_user_history(
                group,
                &**history,
                &ngram,
                word,
                i == 0 && was_auto_capitalized,
                timestamp,
                block_offensive,
            );
            ngram = ngram.next_ngram_context(WordInfo::new(word));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_word_to_user_history(
        &self,
        group: &DictionaryGroup,
        history: &dyn ExpandableDictionary,
        ngram: &NgramContext,
        word: &str,
        was_auto_capitalized: bool,
        timestamp: u64,
        block_offensive: bool,
    ) {
        let max_freq = group_frequency(group, word);
        if max_freq == 0 && block_offensive {
            return;
        }
        let lower = word.to_lowercase();
        let learned = if was_auto_capitalized {
            // Keep the capital only for words that exist solely capitalized.
            if self.is_valid_suggestion_word(word) && !self.is_valid_suggestion_word(&lower) {
                word.to_string()
            } else {
                lower
            }
        } else {
            let lower_main_freq = group
                .main_dict()
                .map_or(NOT_A_PROBABILITY, |main| main.frequency(&lower));
            let threshold = settings().history.capitalized_form_max_probability_for_insert;
            if max_freq < lower_main_freq && lower_main_freq >= threshold {
                lower
            } else {
                word.to_string()
            }
        };
        history.update_entries_for_word(ngram, &learned, max_freq > 0, 1, timestamp);
    }

    /// Forget `word` in every user history, except when it was erased by
    /// backspace.
    pub fn unlearn_from_user_history(
        &self,
        word: &str,
        ngram: &NgramContext,
        timestamp: u64,
        event: InputEvent,
    ) {
        debug!(
            event = ?event,
            prev = ?ngram.nth_prev_word(1),
            timestamp,
            "unlearn from user history"
        );
        if event != InputEvent::Backspace {
            for group in self.shared.groups().iter() {
                if let Some(history) = group.sub_dict(DictKind::UserHistory) {
                    history.remove_unigram_entry(word);
                }
            }
        }
        self.put_word_into_valid_spelling_word_cache(&word.to_lowercase());
    }

    pub fn clear_user_history_dictionary(&self) {
        for group in self.shared.groups().iter() {
            if let Some(history) = group.sub_dict(DictKind::UserHistory) {
                history.clear();
            }
        }
    }

    /// Persist every user history on the loader thread.
    pub fn flush_user_history_dictionaries(&self) {
        let dicts: Vec<Arc<dyn ExpandableDictionary>> = self
            .shared
            .groups()
            .iter()
            .filter_map(|g| g.sub_dict(DictKind::UserHistory).cloned())
            .collect();
        if !dicts.is_empty() {
            self.loader.submit(LoaderWork::Flush(dicts));
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn get_dictionary_stats(&self) -> Vec<DictionaryStats> {
        self.shared
            .groups()
            .iter()
            .flat_map(|g| {
                DictKind::DYNAMIC
                    .into_iter()
                    .filter_map(|kind| g.sub_dict(kind).map(|d| d.stats()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Every word of every `kind` dictionary, group by group.
    pub fn dump_dictionary_for_debug(&self, kind: DictKind) -> Vec<(String, i32)> {
        let mut words = Vec::new();
        for group in self.shared.groups().iter() {
            let Some(dict) = group.sub_dict(kind) else {
                continue;
            };
            let dumped = dict.dump_words();
            debug!(kind = %kind, locale = ?group.locale(), words = dumped.len(), "dictionary dump");
            words.extend(dumped);
        }
        words
    }

    pub fn sub_dict_for_testing(&self, kind: DictKind) -> Option<Arc<dyn ExpandableDictionary>> {
        self.shared
            .groups()
            .first()
            .and_then(|g| g.sub_dict(kind).cloned())
    }
}

impl Default for DictionaryFacilitator {
    fn default() -> Self {
        Self::new(DictionaryFactory::with_defaults())
    }
}

fn empty_groups() -> Groups {
    vec![Arc::new(DictionaryGroup::empty())].into()
}

/// First group, in index order, with the strictly highest confidence among
/// groups that have a locale.
fn most_confident_group(groups: &[Arc<DictionaryGroup>]) -> Option<&DictionaryGroup> {
    let mut best: Option<&DictionaryGroup> = None;
    for group in groups.iter().filter(|g| g.locale().is_some()) {
        if best.map_or(true, |b| group.confidence() > b.confidence()) {
            best = Some(group);
        }
    }
    best
}

/// Groups sharing the highest confidence get full weight; the others keep a
/// reduced typing weight and no gesturing weight.
fn update_weights(groups: &[Arc<DictionaryGroup>]) {
    let weights = &settings().weights;
    let max = groups.iter().map(|g| g.confidence()).max().unwrap_or(0);
    for group in groups {
        if group.confidence() >= max {
            group.set_weights(weights.most_probable, weights.most_probable);
        } else {
            group.set_weights(weights.typing_secondary, weights.gesturing_secondary);
        }
    }
}

fn group_frequency(group: &DictionaryGroup, word: &str) -> i32 {
    if word.is_empty() {
        return NOT_A_PROBABILITY;
    }
    group
        .handles()
        .iter()
        .map(|h| h.frequency(word))
        .fold(NOT_A_PROBABILITY, i32::max)
}

/// Close `kind` of an unpublished group unless a live group shares the
/// handle.
fn close_if_unused(group: &DictionaryGroup, kind: DictKind, live: &[Arc<DictionaryGroup>]) {
    let Some(handle) = group.dict(kind) else {
        return;
    };
    let shared = live
        .iter()
        .any(|g| g.dict(kind).is_some_and(|h| h.same_as(&handle)));
    if !shared {
        group.close_dict(kind);
    }
}
