use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use lexfuse_cli::commands::facilitator_ops::{ContextArgs, SuggestRequest};
use lexfuse_cli::commands::{config_ops, dict_ops, facilitator_ops};
use lexfuse_cli::trace_init::init_tracing;

#[derive(Parser)]
#[command(name = "dicttool", about = "lexfuse dictionary tool")]
struct Cli {
    /// Write a JSON trace to this directory (requires --features trace)
    #[arg(long, global = true)]
    trace_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ContextOpts {
    /// Files directory holding downloaded word lists and user data
    #[arg(long)]
    files_dir: String,
    /// Directory of bundled main_<locale>.dict files
    #[arg(long)]
    assets: Option<String>,
    /// TOML file of word-list enablement preferences
    #[arg(long)]
    prefs: Option<String>,
}

impl ContextOpts {
    fn as_args(&self) -> ContextArgs<'_> {
        ContextArgs {
            files_dir: &self.files_dir,
            assets: self.assets.as_deref(),
            prefs: self.prefs.as_deref(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Compile a dictionary file from a tab-separated word list
    Compile {
        /// Word list (word<TAB>probability[<TAB>offensive], bigram<TAB>prev<TAB>next<TAB>probability)
        word_list: String,
        /// Output file
        output_file: String,
        /// Locale written to the header
        #[arg(long, default_value = "en_US")]
        locale: String,
        /// Format version written to the header
        #[arg(long, default_value = "20")]
        version: u32,
    },
    /// Show dictionary, user dictionary or history info (auto-detected by magic bytes)
    Info {
        /// File to inspect
        file: String,
    },
    /// List the main dictionary files used for a locale
    Resolve {
        #[command(flatten)]
        context: ContextOpts,
        /// Locale, e.g. en_US
        locale: String,
    },
    /// Fuse suggestions for typed input across locales
    Suggest {
        #[command(flatten)]
        context: ContextOpts,
        /// Enabled locale; repeat for multilingual typing (default: en_US)
        #[arg(long = "locale")]
        locales: Vec<String>,
        /// Previous word for bigram context
        #[arg(long)]
        prev: Option<String>,
        /// Treat input as a gesture
        #[arg(long)]
        gesture: bool,
        /// Keep possibly offensive words
        #[arg(long)]
        allow_offensive: bool,
        /// Open user-history dictionaries too
        #[arg(long)]
        personalized: bool,
        /// Print JSON
        #[arg(long)]
        json: bool,
        /// Typed input (empty for predictions)
        #[arg(default_value = "")]
        typed: String,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let _trace = cli.trace_dir.as_deref().map(init_tracing);

    match cli.command {
        Command::Compile {
            word_list,
            output_file,
            locale,
            version,
        } => dict_ops::compile(&word_list, &output_file, &locale, version),
        Command::Info { file } => dict_ops::info(&file),
        Command::Resolve { context, locale } => {
            facilitator_ops::resolve(&context.as_args(), &locale)
        }
        Command::Suggest {
            context,
            locales,
            prev,
            gesture,
            allow_offensive,
            personalized,
            json,
            typed,
        } => facilitator_ops::suggest(
            &context.as_args(),
            &SuggestRequest {
                locales: &locales,
                typed: &typed,
                prev_word: prev.as_deref(),
                gesture,
                allow_offensive,
                personalized,
                json,
            },
        ),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
