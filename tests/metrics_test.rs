//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::json;

use muninn::detectors::{DetectorRegistry, TOKEN_THRESHOLD_DETECTOR, TokenThresholdDetector};
use muninn::telemetry;
use muninn::{CacheConfig, DetectionContext, MemoryCache, MuninnError, Result};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_with_label(snapshot, name, None)
}

/// Sum counter values matching a metric name and, optionally, one label.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            Some((k, v)) => key.key().labels().any(|l| l.key() == k && l.value() == v),
            None => true,
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn cache_in(dir: &tempfile::TempDir, max_entries: usize) -> MemoryCache {
    MemoryCache::new(
        &CacheConfig::new()
            .path(dir.path().join("memory-cache.json"))
            .max_query_entries(max_entries),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn query_hits_and_misses_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();

    metrics::with_local_recorder(&recorder, || {
        let cache = cache_in(&dir, 10);
        cache.get_cached_query("absent");
        cache.cache_query_result("present", json!(1));
        cache.get_cached_query("present");
        cache.get_cached_query("present");
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_HITS_TOTAL, Some(("tier", "query"))),
        2
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_MISSES_TOTAL, Some(("tier", "query"))),
        1
    );
}

#[test]
fn lru_evictions_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();

    metrics::with_local_recorder(&recorder, || {
        let cache = cache_in(&dir, 2);
        for i in 0..5 {
            cache.cache_query_result(&format!("q{i}"), json!(i));
        }
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::CACHE_EVICTIONS_TOTAL,
            Some(("reason", "lru"))
        ),
        3
    );
}

#[test]
fn expired_entries_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();

    metrics::with_local_recorder(&recorder, || {
        let cache = cache_in(&dir, 10);
        cache.cache_query_result_with_ttl("a", json!(1), Duration::ZERO);
        cache.cache_query_result_with_ttl("b", json!(2), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        cache.clear_expired();
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::CACHE_EVICTIONS_TOTAL,
            Some(("reason", "expired"))
        ),
        2
    );
}

#[test]
fn entity_refresh_outcomes_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let dir = tempfile::tempdir().unwrap();

    metrics::with_local_recorder(&recorder, || {
        let cache = cache_in(&dir, 10);
        let failing = || -> Result<Vec<String>> { Err(MuninnError::Refresh("down".into())) };
        let working = || -> Result<Vec<String>> { Ok(vec!["A".to_string()]) };

        let _ = cache.get_entity_names(Some(&failing), false);
        let _ = cache.get_entity_names(Some(&working), false);
        let _ = cache.get_entity_names(Some(&failing), true);
        // fresh: no refresh attempt
        let _ = cache.get_entity_names(Some(&working), false);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let refresh = telemetry::ENTITY_REFRESH_TOTAL;
    assert_eq!(counter_with_label(&snapshot, refresh, Some(("status", "error"))), 1);
    assert_eq!(counter_with_label(&snapshot, refresh, Some(("status", "ok"))), 1);
    assert_eq!(counter_with_label(&snapshot, refresh, Some(("status", "stale"))), 1);
    assert_eq!(counter_total(&snapshot, refresh), 3);
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::CACHE_HITS_TOTAL,
            Some(("tier", "entity_names"))
        ),
        1
    );
}

#[test]
fn detector_triggers_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let mut registry = DetectorRegistry::new();
        registry.register(Arc::new(TokenThresholdDetector::default()));
        let ctx = DetectionContext::new().token_count(160_000);
        registry.evaluate_all("", &ctx);
        registry.evaluate_all("", &ctx);
        registry.evaluate_all("", &ctx);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::DETECTOR_TRIGGERS_TOTAL,
            Some(("detector", TOKEN_THRESHOLD_DETECTOR))
        ),
        2
    );
}

#[test]
fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(&dir, 1);
    cache.cache_query_result("a", json!(1));
    cache.cache_query_result("b", json!(2));
    assert!(cache.get_cached_query("b").is_some());
}
