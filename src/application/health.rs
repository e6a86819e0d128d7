//! Health reporting.

use std::sync::Arc;

use crate::cache::{CacheStatus, TranslationCache};
use crate::domain::locale::LocaleTable;

use super::backend::BackendExecutor;

pub const SERVICE_NAME: &str = "transgate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub service: &'static str,
    pub model_loaded: bool,
    /// Present only while the model is loaded.
    pub model_name: Option<String>,
    pub cache: CacheStatus,
    pub supported_languages: Vec<String>,
}

impl HealthReport {
    /// The process answers as long as it runs; readiness is `model_loaded`.
    pub fn status(&self) -> &'static str {
        "healthy"
    }
}

pub struct HealthService {
    executor: BackendExecutor,
    cache: Arc<TranslationCache>,
    locales: Arc<LocaleTable>,
}

impl HealthService {
    pub fn new(
        executor: BackendExecutor,
        cache: Arc<TranslationCache>,
        locales: Arc<LocaleTable>,
    ) -> Self {
        Self {
            executor,
            cache,
            locales,
        }
    }

    pub async fn report(&self) -> HealthReport {
        let model_loaded = self.executor.is_ready();
        HealthReport {
            service: SERVICE_NAME,
            model_loaded,
            model_name: model_loaded.then(|| self.executor.model_id().to_string()),
            cache: self.cache.status().await,
            supported_languages: self
                .locales
                .codes()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}
