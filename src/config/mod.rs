//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    str::FromStr,
    thread,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::locale::LocaleTable;

pub use cli::{CliArgs, Command, ComponentOverrides, ProbeArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "transgate";
const ENV_PREFIX: &str = "TRANSGATE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_MAX_REQUEST_BYTES: u64 = 2 * 1024 * 1024;
const DEFAULT_CACHE_HOST: &str = "localhost";
const DEFAULT_CACHE_PORT: u16 = 6379;
const DEFAULT_CACHE_DB: u32 = 0;
pub(crate) const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
pub(crate) const DEFAULT_CACHE_MAX_CONCURRENT_OPS: u32 = 100;
pub(crate) const DEFAULT_KEY_MEMO_CAPACITY: usize = 4096;
const DEFAULT_MODEL: &str = "facebook/nllb-200-distilled-600M";
const DEFAULT_BACKEND_ENDPOINT: &str = "http://127.0.0.1:9000";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BACKEND_MAX_LENGTH: u32 = 512;
const DEFAULT_BATCH_SIZE: u32 = 16;
const DEFAULT_MAX_ITEMS: u32 = 1024;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub backend: BackendSettings,
    pub translation: TranslationSettings,
    pub locales: LocaleTable,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub request_timeout: Option<Duration>,
    pub max_request_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
    Disabled,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub url: String,
    pub ttl: Duration,
    pub max_concurrent_ops: NonZeroU32,
    pub key_memo_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub model: String,
    pub endpoint: String,
    pub workers: NonZeroU32,
    pub timeout: Duration,
    pub max_length: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub batch_size: NonZeroUsize,
    pub max_items: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Probe(args)) => raw.apply_component_overrides(&args.components),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    backend: RawBackendSettings,
    translation: RawTranslationSettings,
    locales: Option<Vec<RawLocale>>,
}

/// One `[[locales]]` entry: API code and the backend code it maps to.
#[derive(Debug, Clone, Deserialize)]
struct RawLocale {
    code: String,
    backend: String,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.server_request_timeout_seconds {
            self.server.request_timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(size) = overrides.translation_batch_size {
            self.translation.batch_size = Some(size);
        }
        if let Some(max) = overrides.translation_max_items {
            self.translation.max_items = Some(max);
        }

        self.apply_component_overrides(&overrides.components);
    }

    fn apply_component_overrides(&mut self, overrides: &ComponentOverrides) {
        if let Some(kind) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(kind.clone());
        }
        if let Some(url) = overrides.cache_url.as_ref() {
            self.cache.url = Some(url.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(max) = overrides.cache_max_concurrent_ops {
            self.cache.max_concurrent_ops = Some(max);
        }
        if let Some(model) = overrides.backend_model.as_ref() {
            self.backend.model = Some(model.clone());
        }
        if let Some(endpoint) = overrides.backend_endpoint.as_ref() {
            self.backend.endpoint = Some(endpoint.clone());
        }
        if let Some(workers) = overrides.backend_workers {
            self.backend.workers = Some(workers);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            backend,
            translation,
            locales,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache)?;
        let backend = build_backend_settings(backend)?;
        let translation = build_translation_settings(translation)?;
        let locales = build_locale_table(locales)?;

        Ok(Self {
            server,
            logging,
            cache,
            backend,
            translation,
            locales,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    // Zero disables the request deadline.
    let request_timeout = server
        .request_timeout_seconds
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let max_request_bytes_value = server
        .max_request_bytes
        .unwrap_or(DEFAULT_MAX_REQUEST_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value)
        .ok_or_else(|| LoadError::invalid("server.max_request_bytes", "must be greater than zero"))?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "server.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        request_timeout,
        max_request_bytes,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend {
        Some(kind) => CacheBackendKind::from_str(&kind)
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => CacheBackendKind::Redis,
    };

    let url = match non_empty(cache.url) {
        Some(url) => url,
        None => {
            let host = non_empty(cache.host).unwrap_or_else(|| DEFAULT_CACHE_HOST.to_string());
            let port = cache.port.unwrap_or(DEFAULT_CACHE_PORT);
            if port == 0 {
                return Err(LoadError::invalid(
                    "cache.port",
                    "port must be greater than zero",
                ));
            }
            let db = cache.db.unwrap_or(DEFAULT_CACHE_DB);
            format!("redis://{host}:{port}/{db}")
        }
    };

    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let max_concurrent_ops = non_zero_u32(
        cache
            .max_concurrent_ops
            .unwrap_or(DEFAULT_CACHE_MAX_CONCURRENT_OPS)
            .into(),
        "cache.max_concurrent_ops",
    )?;

    Ok(CacheSettings {
        backend,
        url,
        ttl: Duration::from_secs(ttl_seconds),
        max_concurrent_ops,
        key_memo_capacity: cache.key_memo_capacity.unwrap_or(DEFAULT_KEY_MEMO_CAPACITY),
    })
}

fn build_backend_settings(backend: RawBackendSettings) -> Result<BackendSettings, LoadError> {
    let model = match backend.model {
        Some(model) => non_empty(Some(model))
            .ok_or_else(|| LoadError::invalid("backend.model", "must not be empty"))?,
        None => DEFAULT_MODEL.to_string(),
    };

    let endpoint =
        non_empty(backend.endpoint).unwrap_or_else(|| DEFAULT_BACKEND_ENDPOINT.to_string());
    let endpoint = endpoint.trim_end_matches('/').to_string();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(LoadError::invalid(
            "backend.endpoint",
            format!("`{endpoint}` is not an http(s) URL"),
        ));
    }

    let workers = match backend.workers {
        Some(value) => non_zero_u32(value.into(), "backend.workers")?,
        None => default_worker_count(),
    };

    let timeout_secs = backend
        .timeout_seconds
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "backend.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let max_length = non_zero_u32(
        backend
            .max_length
            .unwrap_or(DEFAULT_BACKEND_MAX_LENGTH)
            .into(),
        "backend.max_length",
    )?;

    Ok(BackendSettings {
        model,
        endpoint,
        workers,
        timeout: Duration::from_secs(timeout_secs),
        max_length,
    })
}

fn build_translation_settings(
    translation: RawTranslationSettings,
) -> Result<TranslationSettings, LoadError> {
    let batch_size = non_zero_usize(
        translation.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        "translation.batch_size",
    )?;
    let max_items = non_zero_usize(
        translation.max_items.unwrap_or(DEFAULT_MAX_ITEMS),
        "translation.max_items",
    )?;

    Ok(TranslationSettings {
        batch_size,
        max_items,
    })
}

fn build_locale_table(locales: Option<Vec<RawLocale>>) -> Result<LocaleTable, LoadError> {
    match locales {
        Some(entries) if !entries.is_empty() => LocaleTable::new(
            entries
                .into_iter()
                .map(|entry| (entry.code, entry.backend)),
        )
        .map_err(|err| LoadError::invalid("locales", err.to_string())),
        _ => Ok(LocaleTable::builtin()),
    }
}

fn default_worker_count() -> NonZeroU32 {
    thread::available_parallelism()
        .ok()
        .and_then(|count| u32::try_from(count.get()).ok())
        .and_then(NonZeroU32::new)
        .unwrap_or(NonZeroU32::MIN)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    db: Option<u32>,
    ttl_seconds: Option<u64>,
    max_concurrent_ops: Option<u32>,
    key_memo_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    model: Option<String>,
    endpoint: Option<String>,
    workers: Option<u32>,
    timeout_seconds: Option<u64>,
    max_length: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTranslationSettings {
    batch_size: Option<u32>,
    max_items: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u32, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
