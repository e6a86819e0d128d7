//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{
    DEFAULT_CACHE_MAX_CONCURRENT_OPS, DEFAULT_CACHE_TTL_SECS, DEFAULT_KEY_MEMO_CAPACITY,
};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiry applied to every written entry.
    pub ttl: Duration,
    /// Capacity of the process-wide concurrency limiter.
    pub max_concurrent_ops: NonZeroUsize,
    /// Entries kept by the key-derivation memo; zero disables it.
    pub key_memo_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_concurrent_ops: NonZeroUsize::new(DEFAULT_CACHE_MAX_CONCURRENT_OPS as usize)
                .unwrap_or(NonZeroUsize::MIN),
            key_memo_capacity: DEFAULT_KEY_MEMO_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            ttl: settings.ttl,
            max_concurrent_ops: NonZeroUsize::new(settings.max_concurrent_ops.get() as usize)
                .unwrap_or(NonZeroUsize::MIN),
            key_memo_capacity: settings.key_memo_capacity,
        }
    }
}
