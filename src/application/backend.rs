//! Translation backend contract and the worker pool that drives it.
//!
//! Backends are synchronous: inference is CPU or accelerator bound, so every
//! call is moved off the async runtime onto a blocking thread. The
//! [`BackendExecutor`] caps how many such threads run at once; callers beyond
//! the cap queue on a semaphore instead of spawning more threads.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("translation model is not loaded")]
    NotLoaded,
    #[error("translation backend unavailable: {0}")]
    Unavailable(String),
    #[error("translation failed: {0}")]
    Inference(String),
    #[error("backend returned {actual} translations for {expected} inputs")]
    OutputMismatch { expected: usize, actual: usize },
    #[error("backend worker failed: {0}")]
    Worker(String),
}

impl BackendError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }
}

/// Stateful, expensive-to-initialize translation engine.
///
/// Implementations must tolerate concurrent calls from several worker threads.
/// Locale arguments are backend codes, already mapped from API codes.
pub trait TranslationBackend: Send + Sync {
    /// Identifier of the model this backend serves.
    fn model_id(&self) -> &str;

    /// One-time initialization. Called on a worker thread.
    fn load(&self) -> Result<(), BackendError>;

    fn is_loaded(&self) -> bool;

    fn translate_one(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<String, BackendError>;

    /// One output per input, same order. Fails as a whole.
    fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> Result<Vec<String>, BackendError>;

    /// Release model state. Called once at process shutdown.
    fn unload(&self);
}

/// Bounded blocking pool in front of a [`TranslationBackend`].
#[derive(Clone)]
pub struct BackendExecutor {
    backend: Arc<dyn TranslationBackend>,
    workers: Arc<Semaphore>,
    worker_count: usize,
}

impl BackendExecutor {
    pub fn new(backend: Arc<dyn TranslationBackend>, workers: usize) -> Self {
        let worker_count = workers.max(1);
        Self {
            backend,
            workers: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_loaded()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub async fn load(&self) -> Result<(), BackendError> {
        let started = Instant::now();
        self.run(|backend| backend.load()).await?;
        info!(
            target = "transgate::backend",
            model = self.model_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "translation model loaded"
        );
        Ok(())
    }

    pub async fn translate_one(
        &self,
        text: String,
        source_locale: String,
        target_locale: String,
    ) -> Result<String, BackendError> {
        self.ensure_ready()?;
        self.run(move |backend| backend.translate_one(&text, &source_locale, &target_locale))
            .await
    }

    pub async fn translate_batch(
        &self,
        texts: Vec<String>,
        source_locale: String,
        target_locale: String,
    ) -> Result<Vec<String>, BackendError> {
        self.ensure_ready()?;
        let expected = texts.len();
        let started = Instant::now();

        let outputs = self
            .run(move |backend| backend.translate_batch(&texts, &source_locale, &target_locale))
            .await;

        let elapsed = started.elapsed();
        histogram!("transgate_backend_batch_ms").record(elapsed.as_secs_f64() * 1000.0);
        debug!(
            target = "transgate::backend",
            items = expected,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = outputs.is_ok(),
            "backend batch finished"
        );

        let outputs = outputs?;
        if outputs.len() != expected {
            return Err(BackendError::OutputMismatch {
                expected,
                actual: outputs.len(),
            });
        }
        Ok(outputs)
    }

    /// Unload the model once in-flight calls drain from the pool.
    pub async fn shutdown(&self) {
        let drained = self.workers.acquire_many(self.worker_count as u32).await;
        if drained.is_err() {
            warn!(
                target = "transgate::backend",
                "worker pool closed before shutdown"
            );
        }
        if let Err(err) = self
            .spawn(
                |backend| {
                    backend.unload();
                    Ok(())
                },
                None,
            )
            .await
        {
            warn!(
                target = "transgate::backend",
                error = %err,
                "backend unload failed"
            );
            return;
        }
        self.workers.close();
        info!(
            target = "transgate::backend",
            model = self.model_id(),
            "translation model unloaded"
        );
    }

    fn ensure_ready(&self) -> Result<(), BackendError> {
        if self.backend.is_loaded() {
            Ok(())
        } else {
            Err(BackendError::NotLoaded)
        }
    }

    async fn run<T, F>(&self, call: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TranslationBackend) -> Result<T, BackendError> + Send + 'static,
    {
        let slot = Arc::clone(&self.workers)
            .acquire_owned()
            .await
            .map_err(|_| BackendError::Worker("worker pool is shut down".to_string()))?;
        self.spawn(call, Some(slot)).await
    }

    /// The slot moves onto the blocking thread and is released when the call
    /// returns, even if the awaiting future was dropped first.
    async fn spawn<T, F>(
        &self,
        call: F,
        slot: Option<OwnedSemaphorePermit>,
    ) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TranslationBackend) -> Result<T, BackendError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || {
            let _slot = slot;
            call(backend.as_ref())
        })
        .await
        .map_err(|err| BackendError::Worker(err.to_string()))?
    }
}
