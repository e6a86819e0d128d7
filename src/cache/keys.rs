//! Content-addressed cache keys.
//!
//! A key is the SHA-256 of the `(text, source, target)` tuple, so identical
//! tuples map to the same entry across restarts and across processes.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use sha2::{Digest, Sha256};

use super::lock::mutex_lock;

pub const KEY_PREFIX: &str = "translation:";

const SOURCE: &str = "cache::keys";

/// Opaque key under which one translation is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the key for a tuple. Pure and unsalted.
pub fn derive_key(text: &str, source_locale: &str, target_locale: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    // Length-prefixed fields keep `("a:b", "c")` and `("a", "b:c")` apart.
    for field in [text, source_locale, target_locale] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    CacheKey(format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize())))
}

type MemoKey = (String, String, String);

/// Key derivation with an optional per-process memo of recent tuples.
///
/// The memo only short-circuits hashing; a miss always falls back to
/// [`derive_key`], so it can never change which key a tuple maps to.
pub struct KeyDeriver {
    memo: Option<Mutex<LruCache<MemoKey, CacheKey>>>,
}

impl KeyDeriver {
    /// `capacity == 0` disables memoization.
    pub fn new(capacity: usize) -> Self {
        Self {
            memo: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn derive(&self, text: &str, source_locale: &str, target_locale: &str) -> CacheKey {
        let Some(memo) = self.memo.as_ref() else {
            return derive_key(text, source_locale, target_locale);
        };

        let memo_key = (
            text.to_string(),
            source_locale.to_string(),
            target_locale.to_string(),
        );
        if let Some(key) = mutex_lock(memo, SOURCE, "derive.get").get(&memo_key) {
            return key.clone();
        }

        let key = derive_key(text, source_locale, target_locale);
        mutex_lock(memo, SOURCE, "derive.put").put(memo_key, key.clone());
        key
    }

    pub fn memoized_len(&self) -> usize {
        self.memo
            .as_ref()
            .map(|memo| mutex_lock(memo, SOURCE, "memoized_len").len())
            .unwrap_or(0)
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tuple_yields_same_key() {
        let first = derive_key("Hello world", "en", "es");
        let second = derive_key("Hello world", "en", "es");
        assert_eq!(first, second);
        assert!(first.as_str().starts_with(KEY_PREFIX));
        assert_eq!(first.as_str().len(), KEY_PREFIX.len() + 64);
    }

    #[test]
    fn key_is_stable_across_processes() {
        // Pinned digest: any change here invalidates every deployed cache.
        let key = derive_key("Hello world", "en", "es");
        assert_eq!(
            key.as_str(),
            "translation:54775b12855a102800675acc4010187d0f69a3d748093cfbd723b100f1ebdc64"
        );
        assert_ne!(key, derive_key("Hello world", "es", "en"));
        assert_ne!(key, derive_key("Hello world", "en", "fr"));
        assert_ne!(key, derive_key("Hello World", "en", "es"));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        assert_ne!(derive_key("a:b", "c", "d"), derive_key("a", "b:c", "d"));
        assert_ne!(derive_key("ab", "", "c"), derive_key("a", "b", "c"));
    }

    #[test]
    fn memoized_derivation_matches_pure_function() {
        let deriver = KeyDeriver::new(2);

        let memoized = deriver.derive("Welcome", "en", "es");
        assert_eq!(memoized, derive_key("Welcome", "en", "es"));
        assert_eq!(deriver.derive("Welcome", "en", "es"), memoized);
        assert_eq!(deriver.memoized_len(), 1);

        let other = deriver.derive("Welcome", "en", "de");
        assert_ne!(other, memoized);
        assert_eq!(deriver.memoized_len(), 2);

        deriver.derive("Goodbye", "en", "es");
        assert_eq!(deriver.memoized_len(), 2);
    }

    #[test]
    fn zero_capacity_disables_memo() {
        let deriver = KeyDeriver::new(0);
        assert_eq!(
            deriver.derive("Hello", "en", "es"),
            derive_key("Hello", "en", "es")
        );
        assert_eq!(deriver.memoized_len(), 0);
    }
}
