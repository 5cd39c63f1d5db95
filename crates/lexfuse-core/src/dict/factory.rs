//! Construction of dictionary handles.
//!
//! Sub-dictionary kinds are looked up in a registry of constructor
//! functions keyed by [`DictKind`]. The main-dictionary loader is a
//! replaceable function as well.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{
    BinaryDictionary, ContactsDictionary, DictError, DictKind, Dictionary, DictionaryCollection,
    ExpandableDictionary, UserDictionary,
};
use crate::context::ImeContext;
use crate::locale::Locale;
use crate::resolver::{self, replace_file_name_dangerous_characters, AssetFileAddress};
use crate::user_history::UserHistoryDictionary;

/// Everything a sub-dictionary constructor gets to see.
#[derive(Debug, Clone, Copy)]
pub struct SubDictParams<'a> {
    pub ctx: &'a ImeContext,
    pub locale: &'a Locale,
    /// Explicit backing file; `None` means the kind's default location.
    pub dict_file: Option<&'a Path>,
    pub name_prefix: &'a str,
    pub account: Option<&'a str>,
}

impl SubDictParams<'_> {
    /// `<files_dir>/<prefix><kind>.<locale>[.<account>].<ext>`, with locale
    /// and account escaped.
    pub fn default_file(&self, kind: DictKind, extension: &str) -> PathBuf {
        let mut name = format!(
            "{}{}.{}",
            self.name_prefix,
            kind.name(),
            replace_file_name_dangerous_characters(&self.locale.to_string())
        );
        if let Some(account) = self.account {
            name.push('.');
            name.push_str(&replace_file_name_dangerous_characters(account));
        }
        name.push('.');
        name.push_str(extension);
        self.ctx.files_dir().join(name)
    }

    fn file_or_default(&self, kind: DictKind, extension: &str) -> PathBuf {
        self.dict_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_file(kind, extension))
    }
}

pub type SubDictFactory = Arc<
    dyn Fn(&SubDictParams<'_>) -> Result<Arc<dyn ExpandableDictionary>, DictError> + Send + Sync,
>;

pub type MainDictLoader = Arc<dyn Fn(&ImeContext, &Locale) -> Arc<dyn Dictionary> + Send + Sync>;

#[derive(Clone)]
pub struct DictionaryFactory {
    subs: HashMap<DictKind, SubDictFactory>,
    main_loader: MainDictLoader,
}

impl DictionaryFactory {
    /// No sub-dictionary kinds; main dictionaries load from the resolver.
    pub fn empty() -> Self {
        Self {
            subs: HashMap::new(),
            main_loader: Arc::new(create_main_dictionary_from_manager),
        }
    }

    /// User, user-history and contacts constructors registered.
    pub fn with_defaults() -> Self {
        Self::empty()
            .register_sub(DictKind::User, create_user_dictionary)
            .register_sub(DictKind::UserHistory, create_user_history_dictionary)
            .register_sub(DictKind::Contacts, create_contacts_dictionary)
    }

    pub fn register_sub<F>(mut self, kind: DictKind, factory: F) -> Self
    where
        F: Fn(&SubDictParams<'_>) -> Result<Arc<dyn ExpandableDictionary>, DictError>
            + Send
            + Sync
            + 'static,
    {
        self.subs.insert(kind, Arc::new(factory));
        self
    }

    pub fn with_main_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&ImeContext, &Locale) -> Arc<dyn Dictionary> + Send + Sync + 'static,
    {
        self.main_loader = Arc::new(loader);
        self
    }

    pub fn supports(&self, kind: DictKind) -> bool {
        self.subs.contains_key(&kind)
    }

    pub fn load_main(&self, ctx: &ImeContext, locale: &Locale) -> Arc<dyn Dictionary> {
        (self.main_loader)(ctx, locale)
    }

    pub fn try_create_sub(
        &self,
        kind: DictKind,
        params: &SubDictParams<'_>,
    ) -> Result<Arc<dyn ExpandableDictionary>, DictError> {
        let factory = self
            .subs
            .get(&kind)
            .ok_or(DictError::MissingFactory(kind))?;
        factory(params)
    }

    /// Build a sub-dictionary. A missing constructor or a failing one is
    /// logged and yields `None`.
    pub fn create_sub(
        &self,
        kind: DictKind,
        params: &SubDictParams<'_>,
    ) -> Option<Arc<dyn ExpandableDictionary>> {
        match self.try_create_sub(kind, params) {
            Ok(dict) => Some(dict),
            Err(e) => {
                error!(kind = %kind, locale = %params.locale, error = %e, "sub-dictionary construction failed");
                None
            }
        }
    }
}

impl Default for DictionaryFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for DictionaryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<DictKind> = self.subs.keys().copied().collect();
        kinds.sort();
        f.debug_struct("DictionaryFactory")
            .field("subs", &kinds)
            .finish_non_exhaustive()
    }
}

fn create_user_dictionary(
    params: &SubDictParams<'_>,
) -> Result<Arc<dyn ExpandableDictionary>, DictError> {
    let path = params.file_or_default(DictKind::User, "lfuw");
    Ok(Arc::new(UserDictionary::open(
        &path,
        Some(params.locale.clone()),
    )?))
}

fn create_user_history_dictionary(
    params: &SubDictParams<'_>,
) -> Result<Arc<dyn ExpandableDictionary>, DictError> {
    let path = params.file_or_default(DictKind::UserHistory, "lfuh");
    Ok(Arc::new(UserHistoryDictionary::open(
        &path,
        Some(params.locale.clone()),
        params.account.map(str::to_string),
    )?))
}

fn create_contacts_dictionary(
    params: &SubDictParams<'_>,
) -> Result<Arc<dyn ExpandableDictionary>, DictError> {
    let provider = params
        .ctx
        .contacts_provider()
        .ok_or_else(|| DictError::Parse("no contacts provider configured".to_string()))?;
    Ok(Arc::new(ContactsDictionary::new(
        Arc::clone(provider),
        Some(params.locale.clone()),
    )))
}

/// Delete a downloaded dictionary file that failed to open so it is never
/// tried again. Bundled files are left alone.
fn quarantine(address: &AssetFileAddress, ctx: &ImeContext) {
    if address.bundled || ctx.is_bundled(&address.path) || !address.path.is_file() {
        return;
    }
    match fs::remove_file(&address.path) {
        Ok(()) => warn!(path = %address.path.display(), "deleted corrupt dictionary file"),
        Err(e) => error!(path = %address.path.display(), error = %e, "failed to delete corrupt dictionary file"),
    }
}

/// Resolve and open the main dictionary files for `locale`. Files that do
/// not parse are quarantined. The result is never `None`; with no usable
/// file it is an empty, uninitialized collection.
pub fn create_main_dictionary_from_manager(
    ctx: &ImeContext,
    locale: &Locale,
) -> Arc<dyn Dictionary> {
    let addresses = resolver::get_dictionary_files(locale, ctx, true);
    let mut members: Vec<Arc<dyn Dictionary>> = Vec::with_capacity(addresses.len());
    for address in &addresses {
        match BinaryDictionary::open(&address.path, address.offset, address.length, DictKind::Main)
        {
            Ok(dict) => members.push(Arc::new(dict)),
            Err(e) => {
                warn!(locale = %locale, path = %address.path.display(), error = %e, "dictionary file unusable");
                quarantine(address, ctx);
            }
        }
    }
    debug!(locale = %locale, files = members.len(), "main dictionary created");
    Arc::new(DictionaryCollection::new(DictKind::Main, members))
}
