use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::settings::settings;

/// Bounded word → validity cache shared with a spell checker.
///
/// The facilitator reads from one instance and writes to another; callers
/// may hand it the same instance for both.
pub struct ValidSpellingWordCache {
    inner: Mutex<LruCache<String, bool>>,
}

impl ValidSpellingWordCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Sized from `cache.valid_spelling_cache_size`.
    pub fn with_default_capacity() -> Self {
        Self::new(settings().cache.valid_spelling_cache_size)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, bool>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, word: &str) -> Option<bool> {
        self.lock().get(word).copied()
    }

    pub fn put(&self, word: String, valid: bool) {
        self.lock().put(word, valid);
    }

    pub fn evict_all(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ValidSpellingWordCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
