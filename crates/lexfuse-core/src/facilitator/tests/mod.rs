
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::*;
use crate::dict::{BinaryDictionary, ContactsProvider, DictionaryBuilder, UserDictionary};
use crate::suggestion::SuggestionKind;
use crate::user_history::{now_epoch, UserHistoryDictionary};

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn words_for(locale: &Locale) -> &'static [(&'static str, u8)] {
    match locale.language() {
        "en" => &[
            ("hello", 200),
            ("help", 150),
            ("the", 220),
            ("Paris", 120),
            ("taxi", 100),
            ("ok", 90),
            ("damn", 0),
        ],
        "fr" => &[
            ("bonjour", 200),
            ("bon", 120),
            ("le", 220),
            ("Paris", 130),
            ("taxi", 100),
            ("ok", 80),
        ],
        "de" => &[("hallo", 200), ("der", 220), ("taxi", 100)],
        _ => &[],
    }
}

fn build_main(locale: &Locale) -> Arc<dyn Dictionary> {
    let mut b = DictionaryBuilder::new(locale, 20);
    for &(word, probability) in words_for(locale) {
        b.add_word(word, probability, false);
    }
    Arc::new(BinaryDictionary::from_bytes(&b.to_bytes().unwrap(), DictKind::Main).unwrap())
}

fn locales(names: &[&str]) -> Vec<Locale> {
    names.iter().map(|n| Locale::parse(n)).collect()
}

fn personalized() -> DictionaryOptions {
    DictionaryOptions {
        use_personalized: true,
        ..Default::default()
    }
}

struct Harness {
    dir: TempDir,
    ctx: ImeContext,
    facilitator: DictionaryFacilitator,
    main_loads: Arc<AtomicUsize>,
    user_creates: Arc<AtomicUsize>,
}

/// Main dictionaries come from [`words_for`]; user dictionaries live in
/// memory; every construction is counted.
fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ImeContext::new(dir.path());
    let main_loads = Arc::new(AtomicUsize::new(0));
    let user_creates = Arc::new(AtomicUsize::new(0));
    let factory = {
        let main_loads = Arc::clone(&main_loads);
        let user_creates = Arc::clone(&user_creates);
        DictionaryFactory::with_defaults()
            .with_main_loader(move |_ctx, locale| {
                main_loads.fetch_add(1, Ordering::SeqCst);
                build_main(locale)
            })
            .register_sub(DictKind::User, move |p| {
                user_creates.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(UserDictionary::new(Some(p.locale.clone())))
                    as Arc<dyn ExpandableDictionary>)
            })
    };
    Harness {
        dir,
        ctx,
        facilitator: DictionaryFacilitator::new(factory),
        main_loads,
        user_creates,
    }
}

impl Harness {
    fn reset(&self, names: &[&str], options: &DictionaryOptions) {
        self.facilitator
            .reset_dictionaries(&self.ctx, &locales(names), options, None);
        assert!(self.facilitator.wait_for_loading_main_dictionaries(WAIT));
    }

    fn learn(&self, text: &str, was_auto_capitalized: bool, block_offensive: bool) {
        self.facilitator.add_to_user_history(
            text,
            was_auto_capitalized,
            &NgramContext::beginning_of_sentence(),
            now_epoch(),
            block_offensive,
        );
    }

    fn history_words(&self) -> Vec<String> {
        self.facilitator
            .dump_dictionary_for_debug(DictKind::UserHistory)
            .into_iter()
            .map(|(w, _)| w)
            .collect()
    }

    fn confidences(&self) -> Vec<u32> {
        self.facilitator
            .dictionary_groups()
            .iter()
            .map(|g| g.confidence())
            .collect()
    }

    fn suggest(&self, composed: ComposedData, ngram: &NgramContext, raw: bool) -> SuggestionResults {
        self.facilitator.get_suggestion_results(
            &composed,
            ngram,
            &ProximityInfo::default(),
            &SuggestionSettings {
                debug_raw_suggestions: raw,
                ..Default::default()
            },
            1,
            InputStyle::Typing,
        )
    }
}

#[derive(Default)]
struct RecordingListener {
    seen: Mutex<Vec<bool>>,
}

impl DictionaryInitializationListener for RecordingListener {
    fn on_update_main_dictionary_availability(&self, available: bool) {
        self.seen.lock().unwrap().push(available);
    }
}

/// Records, at every callback, whether a watched handle is still open.
struct WatchingListener {
    watched: Arc<dyn ExpandableDictionary>,
    open_at_callback: Mutex<Vec<bool>>,
}

impl DictionaryInitializationListener for WatchingListener {
    fn on_update_main_dictionary_availability(&self, _available: bool) {
        self.open_at_callback
            .lock()
            .unwrap()
            .push(self.watched.is_initialized());
    }
}

fn group(locale: Option<&str>, confidence: u32) -> Arc<DictionaryGroup> {
    let g = DictionaryGroup::new(locale.map(Locale::parse), None, None, None, HashMap::new());
    for _ in 0..confidence {
        g.increase_confidence();
    }
    Arc::new(g)
}

// ---------------------------------------------------------------------------
// Latch and cache
// ---------------------------------------------------------------------------

#[test]
fn latch_releases_at_zero() {
    let latch = Arc::new(Latch::new(2));
    assert!(!latch.wait_timeout(Duration::from_millis(10)));
    let remote = Arc::clone(&latch);
    let worker = thread::spawn(move || {
        remote.count_down();
        remote.count_down();
        remote.count_down();
    });
    assert!(latch.wait_timeout(WAIT));
    worker.join().unwrap();
    assert_eq!(latch.count(), 0);
    assert!(Latch::new(0).wait_timeout(Duration::ZERO));
}

#[test]
fn spelling_cache_is_bounded() {
    let cache = ValidSpellingWordCache::new(2);
    cache.put("a".into(), true);
    cache.put("b".into(), false);
    cache.put("c".into(), true);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), Some(false));
    cache.evict_all();
    assert!(cache.is_empty());
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

#[test]
fn starts_inactive() {
    let h = harness();
    assert!(!h.facilitator.is_active());
    assert_eq!(h.facilitator.primary_locale(), Locale::root());
    assert!(h.facilitator.locales().is_empty());
    assert!(h.facilitator.has_at_least_one_uninitialized_main_dictionary());
    assert!(h.facilitator.wait_for_loading_main_dictionaries(Duration::ZERO));
}

#[test]
fn reset_loads_main_in_background() {
    let h = harness();
    h.reset(&["en_US", "fr"], &personalized());
    assert!(h.facilitator.is_active());
    assert_eq!(h.facilitator.locales(), locales(&["en_US", "fr"]));
    assert_eq!(h.main_loads.load(Ordering::SeqCst), 2);
    assert!(h.facilitator.has_at_least_one_initialized_main_dictionary());
    assert!(!h.facilitator.has_at_least_one_uninitialized_main_dictionary());
    for g in h.facilitator.dictionary_groups().iter() {
        assert!(g.has_dict(DictKind::Main, None));
        assert!(g.has_dict(DictKind::Emoji, None));
        assert!(g.has_dict(DictKind::User, None));
        assert!(g.has_dict(DictKind::UserHistory, None));
        assert!(!g.has_dict(DictKind::Contacts, None));
    }
}

#[test]
fn identical_reset_reuses_every_handle() {
    let h = harness();
    h.reset(&["en_US", "fr"], &personalized());
    assert_eq!(h.main_loads.load(Ordering::SeqCst), 2);
    assert_eq!(h.user_creates.load(Ordering::SeqCst), 2);
    let before = h.facilitator.dictionary_groups();

    h.reset(&["en_US", "fr"], &personalized());
    assert_eq!(h.main_loads.load(Ordering::SeqCst), 2);
    assert_eq!(h.user_creates.load(Ordering::SeqCst), 2);
    let after = h.facilitator.dictionary_groups();
    for (old, new) in before.iter().zip(after.iter()) {
        for kind in [DictKind::Main, DictKind::Emoji, DictKind::User, DictKind::UserHistory] {
            let (a, b) = (old.dict(kind).unwrap(), new.dict(kind).unwrap());
            assert!(a.same_as(&b), "{kind} was rebuilt");
            assert!(b.is_initialized(), "{kind} was closed");
        }
    }
}

#[test]
fn forced_reset_rebuilds_and_closes_old_handles() {
    let h = harness();
    h.reset(&["en_US"], &personalized());
    let old_user = h.facilitator.sub_dict_for_testing(DictKind::User).unwrap();
    let old_main = h.facilitator.dictionary_groups()[0].main_dict().unwrap();

    let forced = DictionaryOptions {
        force_reload_all: true,
        ..personalized()
    };
    h.reset(&["en_US"], &forced);
    assert_eq!(h.main_loads.load(Ordering::SeqCst), 2);
    assert_eq!(h.user_creates.load(Ordering::SeqCst), 2);
    assert!(!old_user.is_initialized());
    assert!(!old_main.is_initialized());
    assert!(h.facilitator.has_at_least_one_initialized_main_dictionary());
}

#[test]
fn removed_handles_close_after_listener_sees_new_list() {
    let h = harness();
    h.reset(&["en", "fr"], &personalized());
    let fr_user = h.facilitator.dictionary_groups()[1]
        .sub_dict(DictKind::User)
        .cloned()
        .unwrap();
    let en_user = h.facilitator.sub_dict_for_testing(DictKind::User).unwrap();

    let listener = Arc::new(WatchingListener {
        watched: Arc::clone(&fr_user),
        open_at_callback: Mutex::new(Vec::new()),
    });
    h.facilitator.reset_dictionaries(
        &h.ctx,
        &locales(&["en"]),
        &personalized(),
        Some(Arc::clone(&listener) as Arc<dyn DictionaryInitializationListener>),
    );
    assert_eq!(*listener.open_at_callback.lock().unwrap(), vec![true]);
    assert!(!fr_user.is_initialized());
    assert!(en_user.is_initialized());
    assert!(h.facilitator.is_for_locales(&locales(&["en"])));
}

#[test]
fn listener_hears_about_background_load() {
    let h = harness();
    let listener = Arc::new(RecordingListener::default());
    h.facilitator.reset_dictionaries(
        &h.ctx,
        &locales(&["en"]),
        &DictionaryOptions::default(),
        Some(Arc::clone(&listener) as Arc<dyn DictionaryInitializationListener>),
    );
    assert!(h.facilitator.wait_for_loading_main_dictionaries(WAIT));
    let seen = listener.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.contains(&true));
}

#[test]
fn stale_main_load_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ImeContext::new(dir.path());
    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let loaded: Arc<Mutex<Vec<(Locale, Arc<dyn Dictionary>)>>> = Arc::default();
    let factory = {
        let loaded = Arc::clone(&loaded);
        DictionaryFactory::with_defaults().with_main_loader(move |_ctx, locale| {
            if locale.language() == "fr" {
                let _ = gate.lock().unwrap().recv();
            }
            let dict = build_main(locale);
            loaded.lock().unwrap().push((locale.clone(), Arc::clone(&dict)));
            dict
        })
    };
    let f = DictionaryFacilitator::new(factory);
    let options = DictionaryOptions::default();

    f.reset_dictionaries(&ctx, &locales(&["fr"]), &options, None);
    f.reset_dictionaries(&ctx, &locales(&["en"]), &options, None);
    release.send(()).unwrap();
    assert!(f.wait_for_loading_main_dictionaries(WAIT));

    let loaded = loaded.lock().unwrap();
    assert_eq!(loaded.len(), 2);
    let (fr, fr_dict) = &loaded[0];
    assert_eq!(fr, &Locale::parse("fr"));
    assert!(!fr_dict.is_initialized(), "stale fr dictionary was installed");
    let (en, en_dict) = &loaded[1];
    assert_eq!(en, &Locale::parse("en"));
    assert!(en_dict.is_initialized());

    let groups = f.dictionary_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].locale(), Some(&Locale::parse("en")));
    assert!(groups[0].is_main_initialized());
}

/// Reset to `en`, then reset again to `second` while the user-history
/// constructor of the second reset is blocked and the first main load
/// completes in between. Returns every main dictionary loaded.
fn reset_while_main_installs(
    second: &[&str],
) -> (DictionaryFacilitator, Vec<Arc<dyn Dictionary>>) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ImeContext::new(dir.path());
    let (release_main, main_gate) = mpsc::channel::<()>();
    let main_gate = Mutex::new(main_gate);
    let (release_history, history_gate) = mpsc::channel::<()>();
    let history_gate = Mutex::new(history_gate);
    let (history_started, building) = mpsc::channel::<()>();
    let history_started = Mutex::new(history_started);
    let loaded: Arc<Mutex<Vec<Arc<dyn Dictionary>>>> = Arc::default();
    let factory = {
        let loaded = Arc::clone(&loaded);
        DictionaryFactory::with_defaults()
            .with_main_loader(move |_ctx, locale| {
                let _ = main_gate.lock().unwrap().recv();
                let dict = build_main(locale);
                loaded.lock().unwrap().push(Arc::clone(&dict));
                dict
            })
            .register_sub(DictKind::UserHistory, move |p| {
                let _ = history_started.lock().unwrap().send(());
                let _ = history_gate.lock().unwrap().recv();
                Ok(Arc::new(UserHistoryDictionary::in_memory(
                    Some(p.locale.clone()),
                    None,
                )) as Arc<dyn ExpandableDictionary>)
            })
    };
    let f = DictionaryFacilitator::new(factory);

    f.reset_dictionaries(&ctx, &locales(&["en"]), &DictionaryOptions::default(), None);
    let first = Arc::clone(&f.dictionary_groups()[0]);
    thread::scope(|s| {
        let resetting =
            s.spawn(|| f.reset_dictionaries(&ctx, &locales(second), &personalized(), None));
        building.recv_timeout(WAIT).unwrap();
        release_main.send(()).unwrap();
        drop(release_main);
        let deadline = Instant::now() + WAIT;
        while !first.is_main_initialized() {
            assert!(Instant::now() < deadline, "first main load never installed");
            thread::sleep(Duration::from_millis(1));
        }
        release_history.send(()).unwrap();
        resetting.join().unwrap();
    });
    assert!(f.wait_for_loading_main_dictionaries(WAIT));
    let loaded = loaded.lock().unwrap().clone();
    (f, loaded)
}

#[test]
fn main_installed_during_reset_is_reused() {
    let (f, loaded) = reset_while_main_installs(&["en"]);
    assert_eq!(loaded.len(), 1, "main dictionary loaded twice");
    assert!(loaded[0].is_initialized());
    let groups = f.dictionary_groups();
    let main = groups[0].main_dict().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&main), Arc::as_ptr(&loaded[0])));
    assert!(groups[0].sub_dict(DictKind::UserHistory).is_some());
}

#[test]
fn main_installed_during_reset_is_closed_when_locale_goes() {
    let (f, loaded) = reset_while_main_installs(&["fr"]);
    assert_eq!(loaded.len(), 2);
    assert!(!loaded[0].is_initialized(), "unpublished main left open");
    assert!(loaded[1].is_initialized());
    let groups = f.dictionary_groups();
    assert_eq!(groups[0].locale(), Some(&Locale::parse("fr")));
    assert!(groups[0].is_main_initialized());
}

#[test]
fn concurrent_resets_run_one_after_another() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ImeContext::new(dir.path());
    let created: Arc<Mutex<Vec<Arc<UserDictionary>>>> = Arc::default();
    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let (started_tx, started) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let factory = {
        let created = Arc::clone(&created);
        DictionaryFactory::with_defaults()
            .with_main_loader(|_ctx, locale| build_main(locale))
            .register_sub(DictKind::User, move |p| {
                let dict = Arc::new(UserDictionary::new(Some(p.locale.clone())));
                let first = {
                    let mut created = created.lock().unwrap();
                    created.push(Arc::clone(&dict));
                    created.len() == 1
                };
                if first {
                    let _ = started_tx.lock().unwrap().send(());
                    let _ = gate.lock().unwrap().recv();
                }
                Ok(dict as Arc<dyn ExpandableDictionary>)
            })
    };
    let f = DictionaryFacilitator::new(factory);
    let options = DictionaryOptions::default();

    thread::scope(|s| {
        let en = s.spawn(|| f.reset_dictionaries(&ctx, &locales(&["en"]), &options, None));
        started.recv_timeout(WAIT).unwrap();
        let fr = s.spawn(|| f.reset_dictionaries(&ctx, &locales(&["fr"]), &options, None));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(created.lock().unwrap().len(), 1, "second reset did not wait");
        release.send(()).unwrap();
        en.join().unwrap();
        fr.join().unwrap();
    });
    assert!(f.wait_for_loading_main_dictionaries(WAIT));

    assert!(f.is_for_locales(&locales(&["fr"])));
    let created = created.lock().unwrap();
    assert_eq!(created.len(), 2);
    assert!(!created[0].is_initialized(), "en user dictionary left open");
    assert!(created[1].is_initialized());
}

#[test]
fn reset_evicts_write_cache() {
    let h = harness();
    let cache = Arc::new(ValidSpellingWordCache::new(16));
    h.facilitator
        .set_valid_spelling_word_write_cache(Some(Arc::clone(&cache)));
    cache.put("stale".into(), true);
    h.reset(&["en"], &DictionaryOptions::default());
    assert!(cache.is_empty());
}

#[test]
fn contacts_need_permission() {
    let provider: Arc<dyn ContactsProvider> = Arc::new(vec!["Ada Lovelace".to_string()]);
    let options = DictionaryOptions {
        use_contacts: true,
        account: Some("ada@example.com".into()),
        ..Default::default()
    };

    let mut h = harness();
    h.ctx = h.ctx.clone().with_contacts(Arc::clone(&provider), false);
    h.reset(&["en_US", "fr"], &options);
    assert!(!h.facilitator.uses_contacts());

    h.ctx = h.ctx.clone().with_contacts(provider, true);
    h.reset(&["en_US", "fr"], &options);
    assert!(h.facilitator.uses_contacts());
    assert!(h.facilitator.is_valid_suggestion_word("Lovelace"));
    assert!(h.facilitator.is_for_locales(&locales(&["fr", "en_US"])));
    assert!(!h.facilitator.is_for_locales(&locales(&["en_US"])));
    assert!(h.facilitator.is_for_locale(&Locale::parse("en_US")));
    assert!(h.facilitator.is_for_account(Some("ada@example.com")));
    assert!(!h.facilitator.is_for_account(None));
}

#[test]
fn history_of_another_account_is_not_reused() {
    let h = harness();
    let mut options = personalized();
    options.account = Some("a@example.com".into());
    h.reset(&["en"], &options);
    let old_history = h
        .facilitator
        .sub_dict_for_testing(DictKind::UserHistory)
        .unwrap();

    options.account = Some("b@example.com".into());
    h.reset(&["en"], &options);
    let new_history = h
        .facilitator
        .sub_dict_for_testing(DictKind::UserHistory)
        .unwrap();
    assert!(!std::ptr::addr_eq(
        Arc::as_ptr(&old_history),
        Arc::as_ptr(&new_history)
    ));
    assert!(!old_history.is_initialized());
    assert_eq!(h.user_creates.load(Ordering::SeqCst), 1);
}

#[test]
fn close_dictionaries_closes_everything() {
    let h = harness();
    h.reset(&["en"], &personalized());
    let user = h.facilitator.sub_dict_for_testing(DictKind::User).unwrap();
    let main = h.facilitator.dictionary_groups()[0].main_dict().unwrap();
    h.facilitator.close_dictionaries();
    assert!(!user.is_initialized());
    assert!(!main.is_initialized());
    assert!(!h.facilitator.is_active());
    assert_eq!(h.facilitator.primary_locale(), Locale::root());
    assert!(!h.facilitator.has_at_least_one_initialized_main_dictionary());
}

#[test]
fn reset_for_testing_installs_synchronously() {
    let h = harness();
    let files = HashMap::from([(DictKind::UserHistory, h.dir.path().join("custom.lfuh"))]);
    let en = Locale::parse("en_US");
    h.facilitator
        .reset_dictionaries_for_testing(
            &h.ctx,
            &en,
            &[DictKind::Main, DictKind::UserHistory],
            &files,
            None,
        )
        .unwrap();
    assert!(h.facilitator.has_at_least_one_initialized_main_dictionary());
    assert!(h.facilitator.wait_for_loading_main_dictionaries(Duration::ZERO));
    assert!(h.facilitator.sub_dict_for_testing(DictKind::User).is_none());

    let history = h
        .facilitator
        .sub_dict_for_testing(DictKind::UserHistory)
        .unwrap();
    history.add_unigram_entry("zorg", 100, now_epoch());
    history.flush().unwrap();
    assert!(h.dir.path().join("custom.lfuh").exists());

    let err = h
        .facilitator
        .reset_dictionaries_for_testing(&h.ctx, &en, &[DictKind::Neural], &files, None)
        .unwrap_err();
    assert!(matches!(err, DictError::MissingFactory(DictKind::Neural)));
    assert!(h.facilitator.is_for_locale(&en));
    assert!(history.is_initialized());
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[test]
fn committed_words_shift_confidence() {
    let h = harness();
    h.reset(&["en", "fr"], &DictionaryOptions::default());
    assert_eq!(h.confidences(), vec![0, 0]);

    h.facilitator.on_word_committed("hello");
    assert_eq!(h.confidences(), vec![1, 0]);
    h.facilitator.on_word_committed("bonjour le");
    assert_eq!(h.confidences(), vec![0, 2]);
    h.facilitator.on_word_committed("taxi");
    assert_eq!(h.confidences(), vec![1, 3]);
    h.facilitator.on_word_committed("zzzz   ");
    assert_eq!(h.confidences(), vec![1, 3]);
    h.facilitator.on_word_committed("");
    assert_eq!(h.confidences(), vec![1, 3]);
    assert_eq!(h.facilitator.get_most_confident_locale(), Locale::parse("fr"));
}

#[test]
fn most_confident_locale_first_index_wins_ties() {
    let f = DictionaryFacilitator::new(DictionaryFactory::empty());
    f.shared.replace_groups(
        vec![
            group(Some("en"), 3),
            group(Some("fr"), 5),
            group(Some("de"), 5),
            group(None, 0),
        ]
        .into(),
    );
    assert_eq!(f.get_most_confident_locale(), Locale::parse("fr"));

    f.shared
        .replace_groups(vec![group(Some("en"), 1), group(None, 9)].into());
    assert_eq!(f.get_most_confident_locale(), Locale::parse("en"));

    f.shared
        .replace_groups(vec![group(Some("en"), 0), group(Some("fr"), 0)].into());
    assert_eq!(f.get_most_confident_locale(), Locale::parse("en"));

    f.shared.replace_groups(vec![group(None, 4)].into());
    assert_eq!(f.get_most_confident_locale(), Locale::root());
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[test]
fn suggestions_are_weighted_by_confidence() {
    let h = harness();
    h.reset(&["en", "fr"], &DictionaryOptions::default());
    h.facilitator.on_word_committed("hello");

    let results = h.suggest(ComposedData::typing("bo"), &NgramContext::empty(), false);
    assert_eq!(results.capacity(), settings().suggestions.max_suggestions);
    assert!(results.unique_words().contains(&"bonjour"));
    let groups = h.facilitator.dictionary_groups();
    assert_eq!(groups[0].weight_for_typing(), 1.0);
    assert_eq!(groups[0].weight_for_gesturing(), 1.0);
    assert_eq!(groups[1].weight_for_typing(), 0.8);
    assert_eq!(groups[1].weight_for_gesturing(), 0.0);

    let gesture = h.suggest(ComposedData::gesture("bo"), &NgramContext::empty(), false);
    assert!(!gesture.unique_words().contains(&"bonjour"));
}

#[test]
fn equal_confidence_ranks_by_frequency_across_locales() {
    let h = harness();
    h.reset(&["en", "fr"], &DictionaryOptions::default());
    let results = h.suggest(ComposedData::typing("Par"), &NgramContext::empty(), true);
    let first = results.first().unwrap();
    assert_eq!(first.word, "Paris");
    // fr has the higher probability for the shared word.
    assert_eq!(first.score, 130 * 100);
    let raw = results.raw_suggestions.as_ref().unwrap();
    assert_eq!(raw.iter().filter(|i| i.word == "Paris").count(), 2);
    assert!(!results.is_beginning_of_sentence);

    let bos = h.suggest(
        ComposedData::typing("Par"),
        &NgramContext::beginning_of_sentence(),
        false,
    );
    assert!(bos.is_beginning_of_sentence);
    assert!(bos.raw_suggestions.is_none());
}

#[test]
fn history_predicts_next_word() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");
    h.learn("hello the", false, true);

    let ngram = NgramContext::beginning_of_sentence().next_ngram_context(WordInfo::new("hello"));
    let results = h.suggest(ComposedData::default(), &ngram, false);
    let the = results.iter().find(|i| i.word == "the").unwrap();
    assert_eq!(the.kind, SuggestionKind::Prediction);
    assert_eq!(the.source, DictKind::UserHistory);
}

#[test]
fn next_code_points_span_all_groups() {
    let h = harness();
    h.reset(&["en", "fr", "de"], &DictionaryOptions::default());
    assert_eq!(
        h.facilitator
            .get_valid_next_code_points(&ComposedData::typing("t")),
        vec!['a', 'h']
    );
    assert_eq!(
        h.facilitator
            .get_valid_next_code_points(&ComposedData::typing("ha")),
        vec!['l']
    );
    assert!(h
        .facilitator
        .get_valid_next_code_points(&ComposedData::typing("qq"))
        .is_empty());
}

// ---------------------------------------------------------------------------
// Validity
// ---------------------------------------------------------------------------

#[test]
fn validity_and_frequency() {
    let h = harness();
    h.reset(&["en", "fr"], &DictionaryOptions::default());
    assert!(h.facilitator.is_valid_suggestion_word("bonjour"));
    assert!(h.facilitator.is_valid_spelling_word("hello"));
    assert!(!h.facilitator.is_valid_suggestion_word("Hello"));
    assert!(!h.facilitator.is_valid_suggestion_word(""));
    assert_eq!(h.facilitator.get_frequency("Paris"), 130);
    assert_eq!(h.facilitator.get_frequency("damn"), 0);
    assert_eq!(h.facilitator.get_frequency("nope"), NOT_A_PROBABILITY);
    assert_eq!(h.facilitator.get_frequency(""), NOT_A_PROBABILITY);
}

#[test]
fn read_cache_answers_first() {
    let h = harness();
    h.reset(&["en"], &DictionaryOptions::default());
    let cache = Arc::new(ValidSpellingWordCache::new(16));
    cache.put("hello".into(), false);
    cache.put("zorg".into(), true);
    h.facilitator
        .set_valid_spelling_word_read_cache(Some(Arc::clone(&cache)));
    assert!(!h.facilitator.is_valid_spelling_word("hello"));
    assert!(h.facilitator.is_valid_spelling_word("zorg"));
    assert!(h.facilitator.is_valid_suggestion_word("hello"));

    h.facilitator.set_valid_spelling_word_read_cache(None);
    assert!(h.facilitator.is_valid_spelling_word("hello"));
}

// ---------------------------------------------------------------------------
// Learning
// ---------------------------------------------------------------------------

#[test]
fn nothing_is_learned_without_confidence() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.learn("hello", false, true);
    assert!(h.history_words().is_empty());
}

#[test]
fn unknown_word_becomes_valid_when_typed_twice() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");

    h.learn("lexfuse", false, true);
    assert_eq!(h.history_words(), vec!["lexfuse"]);
    assert!(!h.facilitator.is_valid_suggestion_word("lexfuse"));

    h.learn("lexfuse", false, true);
    assert!(h.facilitator.is_valid_suggestion_word("lexfuse"));
    assert!(h.facilitator.get_frequency("lexfuse") > 0);
}

#[test]
fn known_word_is_valid_immediately() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");
    h.learn("help", false, true);
    let history = h
        .facilitator
        .sub_dict_for_testing(DictKind::UserHistory)
        .unwrap();
    assert!(history.is_valid_word("help"));
}

#[test]
fn learning_normalizes_case() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");

    // Common word typed capitalized: learned lower-cased.
    h.learn("The", false, true);
    // Auto-capitalized word that only exists capitalized: kept.
    h.learn("Paris", true, true);
    // Auto-capitalized common word: lower-cased.
    h.learn("Hello", true, true);
    // Unknown capitalized word typed as such: kept.
    h.learn("Zorg", false, true);
    // Only the first word carries the auto-capitalized flag.
    h.learn("Help Ok", true, true);

    assert_eq!(
        h.history_words(),
        vec!["Ok", "Paris", "Zorg", "hello", "help", "the"]
    );
}

#[test]
fn zero_frequency_words_are_skipped_when_blocking() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");

    h.learn("damn", false, true);
    assert!(h.history_words().is_empty());
    h.learn("damn", false, false);
    assert_eq!(h.history_words(), vec!["damn"]);
}

#[test]
fn learning_targets_most_confident_locale() {
    let h = harness();
    h.reset(&["en", "fr"], &personalized());
    h.facilitator.on_word_committed("bonjour");
    h.learn("bon", false, true);

    let groups = h.facilitator.dictionary_groups();
    let en_history = groups[0].sub_dict(DictKind::UserHistory).unwrap();
    let fr_history = groups[1].sub_dict(DictKind::UserHistory).unwrap();
    assert!(en_history.dump_words().is_empty());
    assert_eq!(fr_history.dump_words().len(), 1);
}

#[test]
fn learning_fills_write_cache_before_recording() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");
    let cache = Arc::new(ValidSpellingWordCache::new(16));
    h.facilitator
        .set_valid_spelling_word_write_cache(Some(Arc::clone(&cache)));

    h.learn("Zorg", false, true);
    assert_eq!(cache.get("zorg"), Some(false));
    assert_eq!(cache.get("Zorg"), Some(false));

    h.learn("hello", false, true);
    assert_eq!(cache.get("hello"), Some(true));
    assert_eq!(cache.get("Hello"), Some(true));
}

#[test]
fn unlearn_ignores_backspace() {
    let h = harness();
    h.reset(&["en"], &personalized());
    h.facilitator.on_word_committed("hello");
    h.learn("help", false, true);
    let cache = Arc::new(ValidSpellingWordCache::new(16));
    h.facilitator
        .set_valid_spelling_word_write_cache(Some(Arc::clone(&cache)));
    let ngram = NgramContext::beginning_of_sentence();

    h.facilitator
        .unlearn_from_user_history("help", &ngram, now_epoch(), InputEvent::Backspace);
    assert_eq!(h.history_words(), vec!["help"]);

    h.facilitator
        .unlearn_from_user_history("help", &ngram, now_epoch(), InputEvent::Rejection);
    assert!(h.history_words().is_empty());
    assert_eq!(cache.get("help"), Some(true));
    assert_eq!(cache.get("Help"), Some(true));
}

#[test]
fn clear_history() {
    let h = harness();
    h.reset(&["en", "fr"], &personalized());
    h.facilitator.on_word_committed("hello");
    h.learn("hello help", false, true);
    assert_eq!(h.history_words().len(), 2);
    h.facilitator.clear_user_history_dictionary();
    assert!(h.history_words().is_empty());
}

#[test]
fn flush_runs_on_loader_and_persists() {
    let h = harness();
    h.reset(&["en_US"], &personalized());
    h.facilitator.on_word_committed("hello");
    h.learn("hello", false, true);

    let checkpoint = h.dir.path().join("history.en_US.lfuh");
    assert!(!checkpoint.exists());
    h.facilitator.flush_user_history_dictionaries();
    assert!(h.facilitator.wait_for_loading_dictionaries_for_testing(WAIT));
    assert!(checkpoint.exists());

    let stats = h.facilitator.get_dictionary_stats();
    let history = stats
        .iter()
        .find(|s| s.kind == DictKind::UserHistory)
        .unwrap();
    assert_eq!(history.word_count, 1);
    assert_eq!(history.file.as_deref(), Some(checkpoint.as_path()));
    assert_eq!(history.locale.as_deref(), Some("en_US"));
    assert!(stats.iter().any(|s| s.kind == DictKind::User));
}
