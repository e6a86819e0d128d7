//! Store abstraction with graceful degradation.
//!
//! [`CacheStore`] is the narrow key/value contract a backing store implements.
//! [`TranslationCache`] layers the process-wide limiter, the fixed TTL and the
//! degrade-to-miss policy on top of it; callers never see store failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::keys::CacheKey;
use super::limiter::{ConcurrencyLimiter, LimiterClosed};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
    #[error("cache returned {actual} values for {expected} keys")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Limiter(#[from] LimiterClosed),
}

impl CacheError {
    pub fn operation(err: impl std::fmt::Display) -> Self {
        Self::Operation(err.to_string())
    }
}

/// Key/value store holding translations under content-hash keys.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Values for `keys`, same length and order, `None` where absent.
    async fn bulk_get(&self, keys: &[CacheKey]) -> Result<Vec<Option<String>>, CacheError>;

    /// Write `value` under `key`, expiring after `ttl`. Overwrites silently.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Human-readable store kind for logs.
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Connected,
    Disconnected,
    NotInitialized,
}

/// Upper bound on a health probe, limiter wait included.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Caching facade shared by all requests.
///
/// Availability is decided once by [`TranslationCache::connect`]; a store that
/// fails its startup probe leaves the cache disabled for the process lifetime.
pub struct TranslationCache {
    store: Option<Arc<dyn CacheStore>>,
    limiter: ConcurrencyLimiter,
    ttl: Duration,
    probe_timeout: Duration,
}

impl TranslationCache {
    pub fn disabled(limiter: ConcurrencyLimiter, ttl: Duration) -> Self {
        Self {
            store: None,
            limiter,
            ttl,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Probe `store` once and keep it only when it answers.
    pub async fn connect(
        store: Arc<dyn CacheStore>,
        limiter: ConcurrencyLimiter,
        ttl: Duration,
    ) -> Self {
        let kind = store.kind();
        match store.ping().await {
            Ok(()) => {
                debug!(target = "transgate::cache", store = kind, "cache store connected");
                Self {
                    store: Some(store),
                    limiter,
                    ttl,
                    probe_timeout: DEFAULT_PROBE_TIMEOUT,
                }
            }
            Err(err) => {
                error!(
                    target = "transgate::cache",
                    store = kind,
                    error = %err,
                    "cache store unreachable at startup; caching disabled"
                );
                Self::disabled(limiter, ttl)
            }
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Gated bulk read that surfaces errors.
    pub async fn bulk_get(&self, keys: &[CacheKey]) -> Result<Vec<Option<String>>, CacheError> {
        let store = self.require_store()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let _permit = self.limiter.acquire().await?;
        let values = store.bulk_get(keys).await?;
        if values.len() != keys.len() {
            return Err(CacheError::ShapeMismatch {
                expected: keys.len(),
                actual: values.len(),
            });
        }
        Ok(values)
    }

    /// Gated write that surfaces errors.
    pub async fn set(&self, key: &CacheKey, value: &str) -> Result<(), CacheError> {
        let store = self.require_store()?;
        let _permit = self.limiter.acquire().await?;
        store.set(key, value, self.ttl).await
    }

    /// Bulk read for the request path. `None` means "treat everything as a miss":
    /// the cache is disabled or the read failed.
    pub async fn lookup(&self, keys: &[CacheKey]) -> Option<Vec<Option<String>>> {
        if !self.is_enabled() {
            return None;
        }

        match self.bulk_get(keys).await {
            Ok(values) => Some(values),
            Err(err) => {
                counter!("transgate_cache_degraded_total").increment(1);
                error!(
                    target = "transgate::cache",
                    keys = keys.len(),
                    error = %err,
                    "cache bulk read failed; treating request as full miss"
                );
                None
            }
        }
    }

    /// Best-effort write. Failures are logged and swallowed.
    pub async fn store(&self, key: &CacheKey, value: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match self.set(key, value).await {
            Ok(()) => true,
            Err(err) => {
                counter!("transgate_cache_write_failed_total").increment(1);
                error!(
                    target = "transgate::cache",
                    key = %key,
                    error = %err,
                    "cache write failed"
                );
                false
            }
        }
    }

    /// Write every entry concurrently, each write holding its own limiter slot.
    /// Returns the number of successful writes.
    pub async fn store_all<'a, I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (&'a CacheKey, &'a str)>,
    {
        if !self.is_enabled() {
            return 0;
        }

        let writes = entries
            .into_iter()
            .map(|(key, value)| self.store(key, value));
        join_all(writes)
            .await
            .into_iter()
            .filter(|stored| *stored)
            .count()
    }

    /// Live connectivity, re-probed on every call.
    pub async fn status(&self) -> CacheStatus {
        let Some(store) = self.store.as_ref() else {
            return CacheStatus::NotInitialized;
        };

        let probe = tokio::time::timeout(self.probe_timeout, async {
            match self.limiter.acquire().await {
                Ok(_permit) => store.ping().await,
                Err(err) => Err(CacheError::from(err)),
            }
        })
        .await
        .unwrap_or_else(|_| Err(CacheError::Unavailable("health probe timed out".to_string())));

        match probe {
            Ok(()) => CacheStatus::Connected,
            Err(err) => {
                warn!(
                    target = "transgate::cache",
                    store = store.kind(),
                    error = %err,
                    "cache health probe failed"
                );
                CacheStatus::Disconnected
            }
        }
    }

    fn require_store(&self) -> Result<&Arc<dyn CacheStore>, CacheError> {
        self.store
            .as_ref()
            .ok_or_else(|| CacheError::Unavailable("cache disabled".to_string()))
    }
}
