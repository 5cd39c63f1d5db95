use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use lexfuse_core::context::AssetDirectory;
use lexfuse_core::dict::DictionaryStats;
use lexfuse_core::ngram::{NgramContext, WordInfo};
use lexfuse_core::prefs::TomlPreferenceStore;
use lexfuse_core::resolver;
use lexfuse_core::settings::settings;
use lexfuse_core::suggestion::{
    ComposedData, InputStyle, ProximityInfo, SuggestedWordInfo, SuggestionSettings,
};
use lexfuse_core::{DictionaryFacilitator, DictionaryOptions, ImeContext, Locale};

/// Where the tool finds dictionaries and preferences.
#[derive(Debug, Clone, Copy)]
pub struct ContextArgs<'a> {
    pub files_dir: &'a str,
    pub assets: Option<&'a str>,
    pub prefs: Option<&'a str>,
}

impl ContextArgs<'_> {
    fn build(&self) -> ImeContext {
        let mut ctx = ImeContext::new(self.files_dir);
        if let Some(assets) = self.assets {
            ctx = ctx.with_bundled(Arc::new(AssetDirectory::new(assets)));
        }
        if let Some(prefs) = self.prefs {
            let store = die!(
                TomlPreferenceStore::open(Path::new(prefs)),
                "Error reading preferences {prefs}: {}"
            );
            ctx = ctx.with_preferences(Arc::new(store));
        }
        ctx
    }
}

pub fn resolve(args: &ContextArgs<'_>, locale: &str) {
    let ctx = args.build();
    let locale = Locale::parse(locale);
    let files = resolver::get_dictionary_files(&locale, &ctx, true);
    if files.is_empty() {
        println!("(no dictionary files for {locale})");
        return;
    }
    for address in &files {
        println!(
            "{}\t{}+{}{}",
            address.path.display(),
            address.offset,
            address.length,
            if address.bundled { "\tbundled" } else { "" }
        );
    }
}

pub struct SuggestRequest<'a> {
    pub locales: &'a [String],
    pub typed: &'a str,
    pub prev_word: Option<&'a str>,
    pub gesture: bool,
    pub allow_offensive: bool,
    pub personalized: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct SuggestOutput<'a> {
    typed: &'a str,
    locales: Vec<String>,
    main_dictionary_available: bool,
    suggestions: Vec<&'a SuggestedWordInfo>,
    stats: Vec<DictionaryStats>,
}

pub fn suggest(args: &ContextArgs<'_>, request: &SuggestRequest<'_>) {
    let ctx = args.build();
    let locales: Vec<Locale> = if request.locales.is_empty() {
        vec![Locale::parse("en_US")]
    } else {
        request.locales.iter().map(|l| Locale::parse(l)).collect()
    };

    let facilitator = DictionaryFacilitator::default();
    let options = DictionaryOptions {
        use_personalized: request.personalized,
        ..Default::default()
    };
    facilitator.reset_dictionaries(&ctx, &locales, &options, None);
    if !facilitator.wait_for_loading_main_dictionaries(settings().loader.wait_timeout()) {
        eprintln!("Warning: main dictionaries still loading, results may be partial");
    }
    let available = facilitator.has_at_least_one_initialized_main_dictionary();
    if !available {
        eprintln!("Warning: no usable main dictionary");
    }

    let ngram = match request.prev_word {
        Some(prev) => NgramContext::beginning_of_sentence().next_ngram_context(WordInfo::new(prev)),
        None => NgramContext::beginning_of_sentence(),
    };
    let composed = if request.gesture {
        ComposedData::gesture(request.typed)
    } else {
        ComposedData::typing(request.typed)
    };
    let suggestion_settings = SuggestionSettings {
        block_offensive: !request.allow_offensive,
        debug_raw_suggestions: false,
    };
    let input_style = if request.gesture {
        InputStyle::TailBatch
    } else {
        InputStyle::Typing
    };
    let results = facilitator.get_suggestion_results(
        &composed,
        &ngram,
        &ProximityInfo::default(),
        &suggestion_settings,
        0,
        input_style,
    );

    if request.json {
        let output = SuggestOutput {
            typed: request.typed,
            locales: locales.iter().map(ToString::to_string).collect(),
            main_dictionary_available: available,
            suggestions: results.iter().collect(),
            stats: facilitator.get_dictionary_stats(),
        };
        let json = die!(serde_json::to_string_pretty(&output), "Error: {}");
        println!("{json}");
    } else if results.is_empty() {
        println!("(no suggestions)");
    } else {
        for (i, info) in results.iter().enumerate() {
            println!(
                "{:>2}. {}\t{}\t{:?}\t{}",
                i + 1,
                info.word,
                info.score,
                info.kind,
                info.source
            );
        }
    }
    facilitator.close_dictionaries();
}
