//! Process-wide composition root.

use std::sync::Arc;

use tracing::{error, info};

use crate::cache::{CacheConfig, CacheStore, ConcurrencyLimiter, TranslationCache};
use crate::config::Settings;

use super::backend::{BackendExecutor, TranslationBackend};
use super::coordinator::{CoordinatorOptions, RequestCoordinator};
use super::health::HealthService;

/// Owns the backend, the cache and the services built on them.
///
/// Built once by [`Gateway::start`] and torn down once by [`Gateway::shutdown`].
#[derive(Clone)]
pub struct Gateway {
    executor: BackendExecutor,
    cache: Arc<TranslationCache>,
    coordinator: Arc<RequestCoordinator>,
    health: Arc<HealthService>,
}

impl Gateway {
    /// Load the backend and probe the cache.
    ///
    /// Neither step is fatal: a backend that fails to load leaves the gateway
    /// running but not ready, and an unreachable store disables caching.
    pub async fn start(
        settings: &Settings,
        backend: Arc<dyn TranslationBackend>,
        store: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        let executor = BackendExecutor::new(backend, settings.backend.workers.get() as usize);
        if let Err(err) = executor.load().await {
            error!(
                target = "transgate::runtime",
                model = executor.model_id(),
                error = %err,
                "translation model failed to load; serving in not-ready state"
            );
        }

        let cache_config = CacheConfig::from(&settings.cache);
        let limiter = ConcurrencyLimiter::new(cache_config.max_concurrent_ops);
        let cache = match store {
            Some(store) => TranslationCache::connect(store, limiter, cache_config.ttl).await,
            None => {
                info!(target = "transgate::runtime", "translation cache disabled");
                TranslationCache::disabled(limiter, cache_config.ttl)
            }
        };
        let cache = Arc::new(cache);

        let locales = Arc::new(settings.locales.clone());
        let coordinator = RequestCoordinator::new(
            executor.clone(),
            Arc::clone(&cache),
            Arc::clone(&locales),
            CoordinatorOptions {
                batch_size: settings.translation.batch_size,
                max_items: settings.translation.max_items,
                request_timeout: settings.server.request_timeout,
                key_memo_capacity: cache_config.key_memo_capacity,
            },
        );
        let health = HealthService::new(executor.clone(), Arc::clone(&cache), locales);

        info!(
            target = "transgate::runtime",
            ready = executor.is_ready(),
            cache_enabled = cache.is_enabled(),
            workers = executor.worker_count(),
            batch_size = settings.translation.batch_size.get(),
            "gateway started"
        );

        Self {
            executor,
            cache,
            coordinator: Arc::new(coordinator),
            health: Arc::new(health),
        }
    }

    pub fn coordinator(&self) -> Arc<RequestCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn health(&self) -> Arc<HealthService> {
        Arc::clone(&self.health)
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn is_ready(&self) -> bool {
        self.executor.is_ready()
    }

    pub async fn shutdown(&self) {
        if self.executor.is_ready() {
            self.executor.shutdown().await;
        }
    }
}
