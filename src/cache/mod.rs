//! Translation cache.
//!
//! Translations are stored under content-hash keys in a shared store
//! (Redis in production, an in-process map otherwise). Every store call passes
//! through one process-wide [`ConcurrencyLimiter`], and every store failure
//! degrades to a miss instead of failing the request.
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! host = "localhost"
//! port = 6379
//! ttl_seconds = 2592000
//! max_concurrent_ops = 100
//! ```

mod config;
mod keys;
mod limiter;
mod lock;
mod memory;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheKey, KEY_PREFIX, KeyDeriver, derive_key};
pub use limiter::{ConcurrencyLimiter, LimiterClosed, LimiterPermit};
pub(crate) use lock::mutex_lock;
pub use memory::MemoryStore;
pub use store::{CacheError, CacheStatus, CacheStore, TranslationCache};
