pub mod context;
pub mod dict;
pub mod facilitator;
pub mod locale;
pub mod ngram;
pub mod prefs;
pub mod resolver;
pub mod settings;
pub mod suggestion;
pub mod unicode;
pub mod user_history;

pub use context::ImeContext;
pub use dict::{DictKind, Dictionary, DictionaryFactory, ExpandableDictionary};
pub use facilitator::{
    DictionaryFacilitator, DictionaryInitializationListener, DictionaryOptions, InputEvent,
};
pub use locale::Locale;
