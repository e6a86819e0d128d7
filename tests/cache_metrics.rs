mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use once_cell::sync::Lazy;
use serial_test::serial;

use transgate::application::coordinator::BatchRequest;
use transgate::application::runtime::Gateway;
use transgate::cache::{CacheStore, MemoryStore};
use transgate::infra::telemetry;

use support::{BrokenStore, DictionaryBackend, settings};

static SNAPSHOTTER: Lazy<Snapshotter> = Lazy::new(|| {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();
    snapshotter
});

/// Counter totals and histogram sample counts keyed by metric name.
fn observed() -> HashMap<String, u64> {
    SNAPSHOTTER
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, value)| {
            let amount = match value {
                DebugValue::Counter(count) => count,
                DebugValue::Histogram(samples) => samples.len() as u64,
                DebugValue::Gauge(_) => 0,
            };
            (composite_key.key().name().to_string(), amount)
        })
        .collect()
}

fn delta(before: &HashMap<String, u64>, after: &HashMap<String, u64>, name: &str) -> u64 {
    after
        .get(name)
        .copied()
        .unwrap_or(0)
        .saturating_sub(before.get(name).copied().unwrap_or(0))
}

fn request(texts: &[&str]) -> BatchRequest {
    BatchRequest {
        texts: texts.iter().map(|text| text.to_string()).collect(),
        caller_ids: (0..texts.len() as i64).collect(),
        source_locale: "en".to_string(),
        target_locale: "es".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn hits_misses_and_batch_latency_are_recorded() {
    Lazy::force(&SNAPSHOTTER);
    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
    let gateway = Gateway::start(&settings(2), Arc::new(DictionaryBackend::new()), Some(store)).await;
    let coordinator = gateway.coordinator();

    let before = observed();
    coordinator
        .translate(request(&["Hello world", "Welcome", "Goodbye"]))
        .await
        .expect("cold request");
    coordinator
        .translate(request(&["Hello world", "Thank you"]))
        .await
        .expect("warm request");
    let after = observed();

    assert_eq!(delta(&before, &after, "transgate_cache_miss_total"), 4);
    assert_eq!(delta(&before, &after, "transgate_cache_hit_total"), 1);
    // Two batches for the cold request, one for the warm one.
    assert!(after.get("transgate_backend_batch_ms").copied().unwrap_or(0) >= 3);
    assert_eq!(delta(&before, &after, "transgate_batch_failed_total"), 0);
}

#[tokio::test]
#[serial]
async fn degradation_and_failures_are_counted() {
    Lazy::force(&SNAPSHOTTER);
    let store: Arc<dyn CacheStore> = Arc::new(BrokenStore);
    let backend = Arc::new(DictionaryBackend::new().poisoned("Goodbye"));
    let gateway = Gateway::start(&settings(1), backend, Some(store)).await;

    let before = observed();
    let result = gateway
        .coordinator()
        .translate(request(&["Welcome", "Goodbye"]))
        .await
        .expect("request");
    let after = observed();

    assert_eq!(result.translated_count(), 2);
    assert_eq!(result.failures().len(), 1);
    assert_eq!(delta(&before, &after, "transgate_cache_degraded_total"), 1);
    assert_eq!(delta(&before, &after, "transgate_cache_write_failed_total"), 1);
    assert_eq!(delta(&before, &after, "transgate_batch_failed_total"), 1);
}

#[tokio::test]
#[serial]
async fn request_deadline_marks_incomplete() {
    Lazy::force(&SNAPSHOTTER);
    let mut settings = settings(1);
    settings.server.request_timeout = Some(Duration::from_millis(150));
    let backend = Arc::new(DictionaryBackend::new().slow(Duration::from_millis(100)));
    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
    let gateway = Gateway::start(&settings, backend, Some(store)).await;

    let before = observed();
    let result = gateway
        .coordinator()
        .translate(request(&["Hello world", "Welcome", "Goodbye", "Thank you"]))
        .await
        .expect("request");
    let after = observed();

    assert!(result.is_incomplete());
    assert!(result.translated_count() < 4);
    assert!(result.outcome(3).is_none());
    assert_eq!(delta(&before, &after, "transgate_request_incomplete_total"), 1);
}
