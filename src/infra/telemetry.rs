use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "transgate_cache_hit_total",
            Unit::Count,
            "Total number of items answered from the translation cache."
        );
        describe_counter!(
            "transgate_cache_miss_total",
            Unit::Count,
            "Total number of items sent to the backend after a cache miss."
        );
        describe_counter!(
            "transgate_cache_degraded_total",
            Unit::Count,
            "Total number of bulk cache reads that failed and degraded to a full miss."
        );
        describe_counter!(
            "transgate_cache_write_failed_total",
            Unit::Count,
            "Total number of best-effort cache writes that failed."
        );
        describe_counter!(
            "transgate_batch_failed_total",
            Unit::Count,
            "Total number of backend batches that failed and produced placeholders."
        );
        describe_histogram!(
            "transgate_backend_batch_ms",
            Unit::Milliseconds,
            "Backend batch translation latency in milliseconds."
        );
        describe_counter!(
            "transgate_request_incomplete_total",
            Unit::Count,
            "Total number of batch requests cut short by the request deadline."
        );
    });
}
