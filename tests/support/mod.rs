#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::num::{NonZeroU32, NonZeroU64, NonZeroUsize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::level_filters::LevelFilter;
use transgate::application::backend::{BackendError, TranslationBackend};
use transgate::cache::{CacheError, CacheKey, CacheStore};
use transgate::config::{
    BackendSettings, CacheBackendKind, CacheSettings, LogFormat, LoggingSettings, ServerSettings,
    Settings, TranslationSettings,
};
use transgate::domain::locale::LocaleTable;

pub const MODEL: &str = "test/dictionary";

/// Backend translating from a fixed English→Spanish dictionary.
///
/// A batch fails when any of its texts is listed in `poison`; unknown words are
/// echoed back in brackets.
pub struct DictionaryBackend {
    entries: BTreeMap<&'static str, &'static str>,
    poison: BTreeSet<String>,
    fail_load: bool,
    delay: Option<Duration>,
    loaded: AtomicBool,
    pub batch_calls: AtomicUsize,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl DictionaryBackend {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::from([
                ("Hello world", "Hola mundo"),
                ("Welcome", "Bienvenido"),
                ("Goodbye", "Adiós"),
                ("Thank you", "Gracias"),
            ]),
            poison: BTreeSet::new(),
            fail_load: false,
            delay: None,
            loaded: AtomicBool::new(false),
            batch_calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn poisoned(mut self, text: &str) -> Self {
        self.poison.insert(text.to_string());
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn lookup(&self, text: &str) -> String {
        self.entries
            .get(text)
            .map(|translation| translation.to_string())
            .unwrap_or_else(|| format!("[{text}]"))
    }
}

impl TranslationBackend for DictionaryBackend {
    fn model_id(&self) -> &str {
        MODEL
    }

    fn load(&self) -> Result<(), BackendError> {
        if self.fail_load {
            return Err(BackendError::unavailable("weights not found"));
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn translate_one(&self, text: &str, _: &str, _: &str) -> Result<String, BackendError> {
        if self.poison.contains(text) {
            return Err(BackendError::inference("CUDA out of memory"));
        }
        Ok(self.lookup(text))
    }

    fn translate_batch(
        &self,
        texts: &[String],
        _: &str,
        _: &str,
    ) -> Result<Vec<String>, BackendError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .expect("batches lock")
            .push(texts.to_vec());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if texts.iter().any(|text| self.poison.contains(text)) {
            return Err(BackendError::inference("CUDA out of memory"));
        }
        Ok(texts.iter().map(|text| self.lookup(text)).collect())
    }

    fn unload(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }
}

/// Store that answers its startup probe and then fails every operation.
pub struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn bulk_get(&self, _: &[CacheKey]) -> Result<Vec<Option<String>>, CacheError> {
        Err(CacheError::Unavailable("connection reset".to_string()))
    }

    async fn set(&self, _: &CacheKey, _: &str, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection reset".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "broken"
    }
}

pub fn settings(batch_size: usize) -> Settings {
    Settings {
        server: ServerSettings {
            addr: "127.0.0.1:0".parse().expect("socket addr"),
            graceful_shutdown: Duration::from_secs(5),
            request_timeout: None,
            max_request_bytes: NonZeroU64::new(16 * 1024).expect("non-zero"),
        },
        logging: LoggingSettings {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        },
        cache: CacheSettings {
            backend: CacheBackendKind::Memory,
            url: "redis://localhost:6379/0".to_string(),
            ttl: Duration::from_secs(300),
            max_concurrent_ops: NonZeroU32::new(4).expect("non-zero"),
            key_memo_capacity: 64,
        },
        backend: BackendSettings {
            model: MODEL.to_string(),
            endpoint: "http://127.0.0.1:9".to_string(),
            workers: NonZeroU32::new(2).expect("non-zero"),
            timeout: Duration::from_secs(5),
            max_length: NonZeroU32::new(512).expect("non-zero"),
        },
        translation: TranslationSettings {
            batch_size: NonZeroUsize::new(batch_size).expect("non-zero"),
            max_items: NonZeroUsize::new(64).expect("non-zero"),
        },
        locales: LocaleTable::builtin(),
    }
}
