//! Batch dispatch of cache misses.

use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheKey, TranslationCache};
use crate::domain::items::{CallerId, ItemOutcome, TranslationResult};
use crate::domain::locale::LocalePair;

use super::backend::BackendExecutor;

/// A cache miss travelling through the pipeline with its caller id attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    pub caller_id: CallerId,
    pub text: String,
    pub key: CacheKey,
}

/// Consecutive, order-preserving batches of at most `batch_size` items.
pub fn partition<T>(items: &[T], batch_size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    items.chunks(batch_size.get())
}

/// Drives the backend one batch at a time and writes results back to the cache.
///
/// Batches never overlap against the backend within a request. Cache writes of
/// a finished batch run concurrently, each one admitted by the cache limiter.
#[derive(Clone)]
pub struct BatchScheduler {
    executor: BackendExecutor,
    cache: Arc<TranslationCache>,
    batch_size: NonZeroUsize,
}

impl BatchScheduler {
    pub fn new(
        executor: BackendExecutor,
        cache: Arc<TranslationCache>,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self {
            executor,
            cache,
            batch_size,
        }
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Translate `items` into `result`.
    ///
    /// A failing batch turns every one of its items into a failure outcome and
    /// processing moves on. When `deadline` passes, dispatch stops, items not yet
    /// resolved stay absent and `result` is marked incomplete.
    pub async fn run(
        &self,
        items: &[PendingItem],
        pair: &LocalePair,
        deadline: Option<Instant>,
        result: &mut TranslationResult,
    ) {
        let total = items.len().div_ceil(self.batch_size.get());

        for (index, batch) in partition(items, self.batch_size).enumerate() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(
                    target = "transgate::scheduler",
                    batch = index,
                    batches = total,
                    skipped_items = items.len() - index * self.batch_size.get(),
                    "request deadline reached before dispatch"
                );
                result.mark_incomplete();
                return;
            }

            let texts: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();
            let call = self.executor.translate_batch(
                texts,
                pair.backend_source.clone(),
                pair.backend_target.clone(),
            );

            let outputs = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                    Ok(outputs) => outputs,
                    Err(_) => {
                        warn!(
                            target = "transgate::scheduler",
                            batch = index,
                            batches = total,
                            items = batch.len(),
                            "request deadline reached while batch was in flight"
                        );
                        result.mark_incomplete();
                        return;
                    }
                },
                None => call.await,
            };

            match outputs {
                Ok(translations) => {
                    debug!(
                        target = "transgate::scheduler",
                        batch = index,
                        batches = total,
                        items = batch.len(),
                        "batch translated"
                    );
                    let written = self
                        .cache
                        .store_all(
                            batch
                                .iter()
                                .zip(translations.iter())
                                .map(|(item, translation)| (&item.key, translation.as_str())),
                        )
                        .await;
                    if self.cache.is_enabled() && written < batch.len() {
                        debug!(
                            target = "transgate::scheduler",
                            batch = index,
                            written,
                            items = batch.len(),
                            "some cache writes were dropped"
                        );
                    }
                    for (item, translation) in batch.iter().zip(translations) {
                        result.record_translated(item.caller_id, ItemOutcome::Translated(translation));
                    }
                }
                Err(err) => {
                    counter!("transgate_batch_failed_total").increment(1);
                    warn!(
                        target = "transgate::scheduler",
                        batch = index,
                        batches = total,
                        items = batch.len(),
                        error = %err,
                        "batch translation failed; emitting placeholders"
                    );
                    let reason = err.to_string();
                    for item in batch {
                        result.record_translated(item.caller_id, ItemOutcome::failed(reason.clone()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::application::backend::{BackendError, TranslationBackend};
    use crate::cache::{ConcurrencyLimiter, MemoryStore, derive_key};

    /// Uppercases its input, failing any batch whose first text is listed.
    #[derive(Default)]
    struct ScriptedBackend {
        fail_on: Vec<String>,
        delay: Option<Duration>,
        loaded: AtomicBool,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl TranslationBackend for ScriptedBackend {
        fn model_id(&self) -> &str {
            "test/scripted"
        }

        fn load(&self) -> Result<(), BackendError> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_loaded(&self) -> bool {
            self.loaded.load(Ordering::SeqCst)
        }

        fn translate_one(&self, text: &str, _: &str, _: &str) -> Result<String, BackendError> {
            Ok(text.to_uppercase())
        }

        fn translate_batch(
            &self,
            texts: &[String],
            _: &str,
            _: &str,
        ) -> Result<Vec<String>, BackendError> {
            self.batches.lock().expect("batches lock").push(texts.to_vec());
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if texts.first().is_some_and(|first| self.fail_on.contains(first)) {
                return Err(BackendError::inference("out of memory"));
            }
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }

        fn unload(&self) {}
    }

    fn pair() -> LocalePair {
        LocalePair {
            source: "en".into(),
            target: "es".into(),
            backend_source: "eng_Latn".into(),
            backend_target: "spa_Latn".into(),
        }
    }

    fn pending(count: usize) -> Vec<PendingItem> {
        (0..count)
            .map(|idx| {
                let text = format!("item-{idx}");
                PendingItem {
                    caller_id: idx as CallerId,
                    key: derive_key(&text, "en", "es"),
                    text,
                }
            })
            .collect()
    }

    async fn scheduler(
        backend: Arc<ScriptedBackend>,
        batch_size: usize,
    ) -> (BatchScheduler, Arc<TranslationCache>) {
        let executor = BackendExecutor::new(backend, 1);
        executor.load().await.expect("load");
        let cache = Arc::new(
            TranslationCache::connect(
                Arc::new(MemoryStore::new()),
                ConcurrencyLimiter::new(NonZeroUsize::new(4).expect("non-zero")),
                Duration::from_secs(60),
            )
            .await,
        );
        let scheduler = BatchScheduler::new(
            executor,
            Arc::clone(&cache),
            NonZeroUsize::new(batch_size).expect("non-zero"),
        );
        (scheduler, cache)
    }

    #[test]
    fn partition_covers_every_item_in_order() {
        let items: Vec<u32> = (0..37).collect();
        let size = NonZeroUsize::new(16).expect("non-zero");

        let batches: Vec<&[u32]> = partition(&items, size).collect();
        assert_eq!(batches.len(), 37_usize.div_ceil(16));
        assert!(batches.iter().all(|batch| batch.len() <= 16));
        let flattened: Vec<u32> = batches.concat();
        assert_eq!(flattened, items);
    }

    #[tokio::test]
    async fn translates_in_sequential_batches_and_caches_results() {
        let backend = Arc::new(ScriptedBackend::default());
        let (scheduler, cache) = scheduler(backend.clone(), 2).await;
        let items = pending(5);
        let mut result = TranslationResult::new();

        scheduler.run(&items, &pair(), None, &mut result).await;

        let batches = backend.batches.lock().expect("batches lock").clone();
        assert_eq!(
            batches,
            vec![
                vec!["item-0".to_string(), "item-1".to_string()],
                vec!["item-2".to_string(), "item-3".to_string()],
                vec!["item-4".to_string()],
            ]
        );
        assert_eq!(result.translated_count(), 5);
        assert_eq!(
            result.outcome(3),
            Some(&ItemOutcome::Translated("ITEM-3".to_string()))
        );

        let keys: Vec<CacheKey> = items.iter().map(|item| item.key.clone()).collect();
        let cached = cache.bulk_get(&keys).await.expect("bulk get");
        assert!(cached.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn failed_batch_yields_failures_and_processing_continues() {
        let backend = Arc::new(ScriptedBackend {
            fail_on: vec!["item-2".to_string()],
            ..Default::default()
        });
        let (scheduler, cache) = scheduler(backend, 2).await;
        let items = pending(6);
        let mut result = TranslationResult::new();

        scheduler.run(&items, &pair(), None, &mut result).await;

        assert_eq!(result.translated_count(), 6);
        assert_eq!(
            result.outcome(1),
            Some(&ItemOutcome::Translated("ITEM-1".to_string()))
        );
        assert!(result.outcome(2).is_some_and(ItemOutcome::is_failure));
        assert!(result.outcome(3).is_some_and(ItemOutcome::is_failure));
        assert_eq!(
            result.outcome(4),
            Some(&ItemOutcome::Translated("ITEM-4".to_string()))
        );
        assert!(result.rendered()[&2].contains("out of memory"));

        let failed_key = items[2].key.clone();
        let cached = cache.bulk_get(&[failed_key]).await.expect("bulk get");
        assert_eq!(cached, vec![None]);
    }

    #[tokio::test]
    async fn expired_deadline_stops_dispatch() {
        let backend = Arc::new(ScriptedBackend::default());
        let (scheduler, _cache) = scheduler(backend.clone(), 2).await;
        let mut result = TranslationResult::new();

        scheduler
            .run(&pending(4), &pair(), Some(Instant::now()), &mut result)
            .await;

        assert!(result.is_incomplete());
        assert_eq!(result.translated_count(), 0);
        assert!(backend.batches.lock().expect("batches lock").is_empty());
    }

    #[tokio::test]
    async fn deadline_during_slow_batch_keeps_earlier_results() {
        let backend = Arc::new(ScriptedBackend {
            delay: Some(Duration::from_millis(150)),
            ..Default::default()
        });
        let (scheduler, _cache) = scheduler(backend, 2).await;
        let mut result = TranslationResult::new();
        let deadline = Instant::now() + Duration::from_millis(220);

        scheduler
            .run(&pending(6), &pair(), Some(deadline), &mut result)
            .await;

        assert!(result.is_incomplete());
        assert_eq!(result.translated_count(), 2);
        assert!(result.outcome(0).is_some());
        assert!(result.outcome(5).is_none());
    }
}
