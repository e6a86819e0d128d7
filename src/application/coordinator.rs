//! Per-request orchestration: validate, resolve cache hits, translate misses, merge.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::cache::{KeyDeriver, TranslationCache};
use crate::domain::error::DomainError;
use crate::domain::items::{CallerId, TranslationItem, TranslationResult};
use crate::domain::locale::{LocalePair, LocaleTable};

use super::backend::{BackendError, BackendExecutor};
use super::scheduler::{BatchScheduler, PendingItem};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("received {texts} texts but {ids} ids")]
    LengthMismatch { texts: usize, ids: usize },
    #[error("request carries {count} items; at most {max} are accepted")]
    TooManyItems { count: usize, max: usize },
    #[error(transparent)]
    UnsupportedLocale(#[from] DomainError),
    #[error("translation model is not loaded")]
    BackendNotReady,
    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for TranslateError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::NotLoaded => Self::BackendNotReady,
            other => Self::Backend(other),
        }
    }
}

/// Batch translation request after transport decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub texts: Vec<String>,
    pub caller_ids: Vec<CallerId>,
    pub source_locale: String,
    pub target_locale: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTranslation {
    pub translation: String,
    pub cached: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorOptions {
    pub batch_size: NonZeroUsize,
    pub max_items: NonZeroUsize,
    pub request_timeout: Option<Duration>,
    pub key_memo_capacity: usize,
}

/// Entry point for translation requests. Shared by every handler.
pub struct RequestCoordinator {
    locales: Arc<LocaleTable>,
    keys: KeyDeriver,
    cache: Arc<TranslationCache>,
    executor: BackendExecutor,
    scheduler: BatchScheduler,
    max_items: NonZeroUsize,
    request_timeout: Option<Duration>,
}

impl RequestCoordinator {
    pub fn new(
        executor: BackendExecutor,
        cache: Arc<TranslationCache>,
        locales: Arc<LocaleTable>,
        options: CoordinatorOptions,
    ) -> Self {
        let scheduler = BatchScheduler::new(executor.clone(), Arc::clone(&cache), options.batch_size);
        Self {
            locales,
            keys: KeyDeriver::new(options.key_memo_capacity),
            cache,
            executor,
            scheduler,
            max_items: options.max_items,
            request_timeout: options.request_timeout,
        }
    }

    pub fn locales(&self) -> &LocaleTable {
        &self.locales
    }

    /// Translate a batch. Only validation and readiness failures are errors;
    /// cache trouble and failed batches are absorbed into the result.
    #[instrument(
        skip_all,
        fields(items = request.texts.len(), source = %request.source_locale, target = %request.target_locale)
    )]
    pub async fn translate(&self, request: BatchRequest) -> Result<TranslationResult, TranslateError> {
        let deadline = self.request_timeout.map(|timeout| Instant::now() + timeout);
        let (items, pair) = self.validate(request)?;
        let mut result = TranslationResult::new();
        if items.is_empty() {
            return Ok(result);
        }

        let keys: Vec<_> = items
            .iter()
            .map(|item| {
                self.keys
                    .derive(item.source_text(), item.source_locale(), item.target_locale())
            })
            .collect();

        let mut cached = self.cache.lookup(&keys).await.map(Vec::into_iter);
        let mut misses = Vec::new();
        for (item, key) in items.into_iter().zip(keys) {
            let hit = cached.as_mut().and_then(Iterator::next).flatten();
            match hit {
                Some(translation) => result.record_cached(item.caller_id(), translation),
                None => misses.push(PendingItem {
                    caller_id: item.caller_id(),
                    text: item.source_text().to_string(),
                    key,
                }),
            }
        }

        counter!("transgate_cache_hit_total").increment(result.cached_count() as u64);
        counter!("transgate_cache_miss_total").increment(misses.len() as u64);

        if !misses.is_empty() {
            self.scheduler.run(&misses, &pair, deadline, &mut result).await;
        }

        if result.is_incomplete() {
            counter!("transgate_request_incomplete_total").increment(1);
        }

        let failed = result.failures().len();
        info!(
            cached = result.cached_count(),
            translated = result.translated_count(),
            failed,
            incomplete = result.is_incomplete(),
            "batch request resolved"
        );
        Ok(result)
    }

    /// Translate one text through the same cache. Backend failure is an error here.
    #[instrument(skip_all, fields(source = %source_locale, target = %target_locale))]
    pub async fn translate_text(
        &self,
        text: String,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<TextTranslation, TranslateError> {
        let pair = self.resolve(source_locale, target_locale)?;
        let key = self.keys.derive(&text, &pair.source, &pair.target);

        let hit = self
            .cache
            .lookup(std::slice::from_ref(&key))
            .await
            .and_then(|values| values.into_iter().next().flatten());
        if let Some(translation) = hit {
            counter!("transgate_cache_hit_total").increment(1);
            return Ok(TextTranslation {
                translation,
                cached: true,
            });
        }
        counter!("transgate_cache_miss_total").increment(1);

        let translation = self
            .executor
            .translate_one(text, pair.backend_source, pair.backend_target)
            .await
            .inspect_err(|err| warn!(error = %err, "single text translation failed"))?;
        self.cache.store(&key, &translation).await;

        Ok(TextTranslation {
            translation,
            cached: false,
        })
    }

    fn validate(
        &self,
        request: BatchRequest,
    ) -> Result<(Vec<TranslationItem>, LocalePair), TranslateError> {
        let BatchRequest {
            texts,
            caller_ids,
            source_locale,
            target_locale,
        } = request;

        if texts.len() != caller_ids.len() {
            return Err(TranslateError::LengthMismatch {
                texts: texts.len(),
                ids: caller_ids.len(),
            });
        }
        if texts.len() > self.max_items.get() {
            return Err(TranslateError::TooManyItems {
                count: texts.len(),
                max: self.max_items.get(),
            });
        }

        let pair = self.resolve(&source_locale, &target_locale)?;
        let items = texts
            .into_iter()
            .zip(caller_ids)
            .map(|(text, caller_id)| {
                TranslationItem::new(text, caller_id, pair.source.as_str(), pair.target.as_str())
            })
            .collect();
        Ok((items, pair))
    }

    fn resolve(&self, source: &str, target: &str) -> Result<LocalePair, TranslateError> {
        let pair = self.locales.resolve_pair(source, target)?;
        if !self.executor.is_ready() {
            return Err(TranslateError::BackendNotReady);
        }
        Ok(pair)
    }
}
