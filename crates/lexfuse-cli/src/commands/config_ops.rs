use std::fs;

pub fn settings_export() {
    print!("{}", lexfuse_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        lexfuse_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: weights={}/{}/{}, suggestions.max={}, history.max_unigrams={}, loader.wait={}ms",
        s.weights.most_probable,
        s.weights.typing_secondary,
        s.weights.gesturing_secondary,
        s.suggestions.max_suggestions,
        s.history.max_unigrams,
        s.loader.wait_timeout_ms,
    );
}
