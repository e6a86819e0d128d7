use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the transgate binary.
#[derive(Debug, Parser)]
#[command(name = "transgate", version, about = "Batch translation gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TRANSGATE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the translation HTTP service.
    Serve(Box<ServeArgs>),
    /// Initialize the backend and cache once, print the health report and exit.
    Probe(ProbeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub components: ComponentOverrides,
}

/// Overrides shared by every command that touches the cache or the backend.
#[derive(Debug, Args, Default, Clone)]
pub struct ComponentOverrides {
    /// Override the cache store kind (redis|memory|disabled).
    #[arg(long = "cache-backend", value_name = "KIND")]
    pub cache_backend: Option<String>,

    /// Override the cache connection URL.
    #[arg(long = "cache-url", value_name = "URL")]
    pub cache_url: Option<String>,

    /// Override the cache entry time-to-live.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the maximum number of concurrent cache operations.
    #[arg(long = "cache-max-concurrent-ops", value_name = "COUNT")]
    pub cache_max_concurrent_ops: Option<u32>,

    /// Override the backend model identifier.
    #[arg(long = "backend-model", value_name = "MODEL")]
    pub backend_model: Option<String>,

    /// Override the backend inference endpoint.
    #[arg(long = "backend-endpoint", value_name = "URL")]
    pub backend_endpoint: Option<String>,

    /// Override the backend worker pool size.
    #[arg(long = "backend-workers", value_name = "COUNT")]
    pub backend_workers: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub components: ComponentOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the per-request deadline (0 disables it).
    #[arg(long = "server-request-timeout-seconds", value_name = "SECONDS")]
    pub server_request_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the number of items sent to the backend per batch.
    #[arg(long = "translation-batch-size", value_name = "COUNT")]
    pub translation_batch_size: Option<u32>,

    /// Override the maximum number of items accepted per request.
    #[arg(long = "translation-max-items", value_name = "COUNT")]
    pub translation_max_items: Option<u32>,
}
