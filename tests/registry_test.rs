//! Tests for [`DetectorRegistry`]: ordering, replacement and evaluation.

use std::sync::Arc;

use muninn::detectors::{
    Detector, DetectorRegistry, ENTITY_MENTION_DETECTOR, KEYWORD_DETECTOR,
    PROJECT_SWITCH_DETECTOR, TOKEN_THRESHOLD_DETECTOR,
};
use muninn::project::InMemoryProjectTracker;
use muninn::{CacheConfig, Config, DetectionContext, MemoryCache, QueryType, TriggerResult};

// ============================================================================
// Stub detector
// ============================================================================

struct Stub {
    name: &'static str,
    priority: i32,
    enabled: bool,
    fires: bool,
}

impl Stub {
    fn new(name: &'static str, priority: i32) -> Self {
        Self {
            name,
            priority,
            enabled: true,
            fires: true,
        }
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn silent(mut self) -> Self {
        self.fires = false;
        self
    }
}

impl Detector for Stub {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, _prompt: &str, _context: &DetectionContext) -> Option<TriggerResult> {
        self.fires
            .then(|| TriggerResult::new(QueryType::KeywordSearch, 0.5, 10, self.name))
    }
}

fn names(detectors: &[Arc<dyn Detector>]) -> Vec<String> {
    detectors.iter().map(|d| d.name().to_string()).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn empty_registry() {
    let registry = DetectorRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.get("nonexistent").is_none());
    assert!(registry.get_enabled_detectors().is_empty());
    assert!(registry.list_detectors().is_empty());
}

#[test]
fn enabled_detectors_sorted_by_priority() {
    let mut registry = DetectorRegistry::new();
    registry.register(Arc::new(Stub::new("c", 3)));
    registry.register(Arc::new(Stub::new("a", 1)));
    registry.register(Arc::new(Stub::new("b", 2)));

    assert_eq!(names(&registry.get_enabled_detectors()), vec!["a", "b", "c"]);
    // listing keeps registration order
    assert_eq!(registry.list_detectors(), vec!["c", "a", "b"]);
}

#[test]
fn priority_ties_keep_registration_order() {
    let mut registry = DetectorRegistry::new();
    registry.register(Arc::new(Stub::new("second", 1)));
    registry.register(Arc::new(Stub::new("first", 0)));
    registry.register(Arc::new(Stub::new("third", 1)));

    assert_eq!(
        names(&registry.get_enabled_detectors()),
        vec!["first", "second", "third"]
    );
}

#[test]
fn disabled_detectors_are_skipped() {
    let mut registry = DetectorRegistry::new();
    registry.register(Arc::new(Stub::new("on", 1)));
    registry.register(Arc::new(Stub::new("off", 0).disabled()));

    assert_eq!(names(&registry.get_enabled_detectors()), vec!["on"]);
    assert_eq!(registry.len(), 2);
}

#[test]
fn register_replaces_by_name_in_place() {
    let mut registry = DetectorRegistry::new();
    registry.register(Arc::new(Stub::new("a", 1)));
    registry.register(Arc::new(Stub::new("b", 2)));
    registry.register(Arc::new(Stub::new("a", 5)));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.list_detectors(), vec!["a", "b"]);
    assert_eq!(registry.get("a").unwrap().priority(), 5);
    assert_eq!(names(&registry.get_enabled_detectors()), vec!["b", "a"]);
}

#[test]
fn unregister_removes_by_name() {
    let mut registry = DetectorRegistry::new();
    registry.register(Arc::new(Stub::new("a", 1)));

    assert!(registry.unregister("a"));
    assert!(!registry.unregister("a"));
    assert!(registry.is_empty());
}

#[test]
fn evaluate_all_collects_triggers_in_priority_order() {
    let mut registry = DetectorRegistry::new();
    registry.register(Arc::new(Stub::new("late", 9)));
    registry.register(Arc::new(Stub::new("quiet", 2).silent()));
    registry.register(Arc::new(Stub::new("early", 1)));
    registry.register(Arc::new(Stub::new("off", 0).disabled()));

    let triggers = registry.evaluate_all("anything", &DetectionContext::new());
    let fired: Vec<&str> = triggers.iter().map(|t| t.detector.as_str()).collect();
    assert_eq!(fired, vec!["early", "late"]);
    assert_eq!(triggers[0].result.reason, "early");
}

#[test]
fn from_config_builds_standard_detectors() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MemoryCache::new(
        &CacheConfig::new().path(dir.path().join("memory-cache.json")),
    ));

    let registry = DetectorRegistry::from_config(
        &Config::default(),
        cache,
        Arc::new(InMemoryProjectTracker::new()),
        None,
    );

    assert_eq!(
        names(&registry.get_enabled_detectors()),
        vec![
            PROJECT_SWITCH_DETECTOR,
            KEYWORD_DETECTOR,
            ENTITY_MENTION_DETECTOR,
            TOKEN_THRESHOLD_DETECTOR
        ]
    );
}

#[test]
fn from_config_honours_detector_settings() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MemoryCache::new(
        &CacheConfig::new().path(dir.path().join("memory-cache.json")),
    ));
    let config = Config::from_toml_str(
        r#"
        [detectors.keyword]
        enabled = false

        [detectors.token_threshold]
        priority = 0
        thresholds = [1000]
        "#,
    )
    .unwrap();

    let registry =
        DetectorRegistry::from_config(&config, cache, Arc::new(InMemoryProjectTracker::new()), None);

    assert_eq!(
        names(&registry.get_enabled_detectors()),
        vec![
            TOKEN_THRESHOLD_DETECTOR,
            PROJECT_SWITCH_DETECTOR,
            ENTITY_MENTION_DETECTOR
        ]
    );

    let triggers = registry.evaluate_all(
        "do you remember the design?",
        &DetectionContext::new().token_count(2_000),
    );
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].detector, TOKEN_THRESHOLD_DETECTOR);
    assert_eq!(triggers[0].result.query_type, QueryType::ThresholdCheck);
}
