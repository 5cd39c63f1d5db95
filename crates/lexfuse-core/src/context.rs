//! Environment handed to the facilitator: where files live, which word lists
//! are enabled, what ships with the application.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dict::ContactsProvider;
use crate::locale::Locale;
use crate::prefs::PreferenceStore;
use crate::resolver::AssetFileAddress;

/// Name of the directory under `files_dir` holding downloaded word lists,
/// one sub-directory per locale.
pub const DICTS_DIR: &str = "dicts";

/// Dictionaries shipped with the application.
pub trait BundledDictionaries: Send + Sync {
    /// The bundled main dictionary for `locale`, if any.
    fn dictionary_for(&self, locale: &Locale) -> Option<AssetFileAddress>;

    /// Generic dictionary used when nothing matches the locale.
    fn fallback(&self) -> Option<AssetFileAddress>;

    /// Whether `path` belongs to the bundled set. Bundled files are never
    /// deleted by quarantine.
    fn is_bundled(&self, path: &Path) -> bool;
}

/// Bundled dictionaries in a directory, named `main_<locale>.dict` (lower
/// case), `main_<language>.dict` and `main_fallback.dict`.
#[derive(Debug, Clone)]
pub struct AssetDirectory {
    dir: PathBuf,
}

impl AssetDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn address(&self, stem: &str) -> Option<AssetFileAddress> {
        let path = self.dir.join(format!("main_{stem}.dict"));
        AssetFileAddress::from_file(&path)
            .ok()
            .map(AssetFileAddress::into_bundled)
    }
}

impl BundledDictionaries for AssetDirectory {
    fn dictionary_for(&self, locale: &Locale) -> Option<AssetFileAddress> {
        if locale.is_root() {
            return None;
        }
        let full = locale.to_string().to_lowercase();
        self.address(&full).or_else(|| {
            if full == locale.language() {
                None
            } else {
                self.address(locale.language())
            }
        })
    }

    fn fallback(&self) -> Option<AssetFileAddress> {
        self.address("fallback")
    }

    fn is_bundled(&self, path: &Path) -> bool {
        path.starts_with(&self.dir)
    }
}

/// Explicitly passed environment; there are no process-wide singletons apart
/// from the tuning settings.
#[derive(Clone)]
pub struct ImeContext {
    files_dir: PathBuf,
    preferences: Option<Arc<dyn PreferenceStore>>,
    bundled: Option<Arc<dyn BundledDictionaries>>,
    contacts: Option<Arc<dyn ContactsProvider>>,
    contacts_permission: bool,
}

impl ImeContext {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
            preferences: None,
            bundled: None,
            contacts: None,
            contacts_permission: false,
        }
    }

    pub fn with_preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    pub fn with_bundled(mut self, bundled: Arc<dyn BundledDictionaries>) -> Self {
        self.bundled = Some(bundled);
        self
    }

    /// Contacts source plus whether the user granted access to it.
    pub fn with_contacts(mut self, provider: Arc<dyn ContactsProvider>, granted: bool) -> Self {
        self.contacts = Some(provider);
        self.contacts_permission = granted;
        self
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn dicts_dir(&self) -> PathBuf {
        self.files_dir.join(DICTS_DIR)
    }

    pub fn preferences(&self) -> Option<&dyn PreferenceStore> {
        self.preferences.as_deref()
    }

    pub fn bundled(&self) -> Option<&dyn BundledDictionaries> {
        self.bundled.as_deref()
    }

    pub fn is_bundled(&self, path: &Path) -> bool {
        self.bundled.as_ref().is_some_and(|b| b.is_bundled(path))
    }

    pub fn contacts_provider(&self) -> Option<&Arc<dyn ContactsProvider>> {
        self.contacts.as_ref()
    }

    pub fn contacts_permission_granted(&self) -> bool {
        self.contacts_permission && self.contacts.is_some()
    }
}

impl fmt::Debug for ImeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImeContext")
            .field("files_dir", &self.files_dir)
            .field("preferences", &self.preferences.is_some())
            .field("bundled", &self.bundled.is_some())
            .field("contacts_permission", &self.contacts_permission)
            .finish()
    }
}
