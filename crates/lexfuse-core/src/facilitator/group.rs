use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::dict::{DictHandle, DictKind, Dictionary, ExpandableDictionary};
use crate::locale::Locale;

/// The dictionaries serving one locale and account.
///
/// The main handle is swapped in by the loader after publication; every
/// other handle is fixed at construction. Confidence and weights are
/// updated in place from the typing thread.
pub struct DictionaryGroup {
    locale: Option<Locale>,
    account: Option<String>,
    confidence: AtomicU32,
    /// `f32` bit patterns.
    weight_for_typing: AtomicU32,
    weight_for_gesturing: AtomicU32,
    main: RwLock<Option<Arc<dyn Dictionary>>>,
    emoji: Option<Arc<dyn Dictionary>>,
    subs: HashMap<DictKind, Arc<dyn ExpandableDictionary>>,
}

impl DictionaryGroup {
    pub(crate) fn new(
        locale: Option<Locale>,
        main: Option<Arc<dyn Dictionary>>,
        emoji: Option<Arc<dyn Dictionary>>,
        account: Option<String>,
        subs: HashMap<DictKind, Arc<dyn ExpandableDictionary>>,
    ) -> Self {
        Self {
            locale,
            account,
            confidence: AtomicU32::new(0),
            weight_for_typing: AtomicU32::new(1.0f32.to_bits()),
            weight_for_gesturing: AtomicU32::new(1.0f32.to_bits()),
            main: RwLock::new(main),
            emoji,
            subs,
        }
    }

    /// A group with no locale and no dictionaries.
    pub(crate) fn empty() -> Self {
        Self::new(None, None, None, None, HashMap::new())
    }

    pub fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn confidence(&self) -> u32 {
        self.confidence.load(Ordering::Relaxed)
    }

    pub(crate) fn increase_confidence(&self) {
        self.confidence.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_confidence(&self) {
        self.confidence.store(0, Ordering::Relaxed);
    }

    pub fn weight_for_typing(&self) -> f32 {
        f32::from_bits(self.weight_for_typing.load(Ordering::Relaxed))
    }

    pub fn weight_for_gesturing(&self) -> f32 {
        f32::from_bits(self.weight_for_gesturing.load(Ordering::Relaxed))
    }

    pub(crate) fn weight_for(&self, is_batch_mode: bool) -> f32 {
        if is_batch_mode {
            self.weight_for_gesturing()
        } else {
            self.weight_for_typing()
        }
    }

    pub(crate) fn set_weights(&self, typing: f32, gesturing: f32) {
        self.weight_for_typing
            .store(typing.to_bits(), Ordering::Relaxed);
        self.weight_for_gesturing
            .store(gesturing.to_bits(), Ordering::Relaxed);
    }

    pub fn main_dict(&self) -> Option<Arc<dyn Dictionary>> {
        self.main
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn is_main_initialized(&self) -> bool {
        self.main_dict().is_some_and(|d| d.is_initialized())
    }

    /// Replace the main handle. The previous one is closed unless it is the
    /// very same object.
    pub(crate) fn set_main_dict(&self, main: Option<Arc<dyn Dictionary>>) {
        let new_ptr = main.as_ref().map(Arc::as_ptr);
        let old = {
            let mut guard = self.main.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, main)
        };
        let Some(old) = old else { return };
        let unchanged = new_ptr.is_some_and(|new| std::ptr::addr_eq(new, Arc::as_ptr(&old)));
        if !unchanged {
            old.close();
        }
    }

    pub fn emoji_dict(&self) -> Option<Arc<dyn Dictionary>> {
        self.emoji.clone()
    }

    pub fn sub_dict(&self, kind: DictKind) -> Option<&Arc<dyn ExpandableDictionary>> {
        self.subs.get(&kind)
    }

    pub fn dict(&self, kind: DictKind) -> Option<DictHandle> {
        match kind {
            DictKind::Main => self.main_dict().map(DictHandle::ReadOnly),
            DictKind::Emoji => self.emoji.clone().map(DictHandle::ReadOnly),
            _ => self.subs.get(&kind).cloned().map(DictHandle::Expandable),
        }
    }

    /// Whether a handle of `kind` is present. A user-history handle only
    /// counts when it belongs to `account`.
    pub fn has_dict(&self, kind: DictKind, account: Option<&str>) -> bool {
        match kind {
            DictKind::Main => self.main_dict().is_some(),
            DictKind::Emoji => self.emoji.is_some(),
            DictKind::UserHistory if self.account() != account => false,
            _ => self.subs.contains_key(&kind),
        }
    }

    /// Every present handle, in query order.
    pub fn handles(&self) -> Vec<DictHandle> {
        DictKind::ALL
            .into_iter()
            .filter_map(|kind| self.dict(kind))
            .collect()
    }

    /// Kinds with a handle, whatever the account.
    pub(crate) fn kinds(&self) -> Vec<DictKind> {
        DictKind::ALL
            .into_iter()
            .filter(|&kind| self.dict(kind).is_some())
            .collect()
    }

    pub(crate) fn close_dict(&self, kind: DictKind) {
        let handle = match kind {
            DictKind::Main => self
                .main
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .map(DictHandle::ReadOnly),
            _ => self.dict(kind),
        };
        if let Some(handle) = handle {
            debug!(locale = ?self.locale, kind = %kind, "closing dictionary");
            handle.close();
        }
    }

    pub(crate) fn close_all(&self) {
        for kind in self.kinds() {
            self.close_dict(kind);
        }
    }
}

impl fmt::Debug for DictionaryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryGroup")
            .field("locale", &self.locale)
            .field("account", &self.account)
            .field("confidence", &self.confidence())
            .field("kinds", &self.kinds())
            .finish()
    }
}
