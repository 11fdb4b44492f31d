//! Detector registry.
//!
//! Detectors are kept in registration order and are unique by name.
//! [`DetectorRegistry::get_enabled_detectors`] yields the enabled subset
//! sorted by ascending priority, ties broken by registration order.

use std::sync::Arc;

use tracing::debug;

use super::entity::{EntityMentionDetector, EntitySource};
use super::keyword::KeywordDetector;
use super::project::ProjectSwitchDetector;
use super::token::TokenThresholdDetector;
use super::traits::Detector;
use crate::cache::MemoryCache;
use crate::config::Config;
use crate::project::ProjectTracker;
use crate::telemetry;
use crate::types::{DetectionContext, TriggerResult};

/// A trigger produced by a named detector.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorTrigger {
    pub detector: String,
    pub result: TriggerResult,
}

/// Ordered collection of detectors, unique by name.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with the four standard detectors configured from
    /// `config`.
    ///
    /// The entity detector reads names from `cache` and refreshes them from
    /// `entity_source` when one is given.
    pub fn from_config(
        config: &Config,
        cache: Arc<MemoryCache>,
        tracker: Arc<dyn ProjectTracker>,
        entity_source: Option<Arc<dyn EntitySource>>,
    ) -> Self {
        let detectors = &config.detectors;

        let mut entity = EntityMentionDetector::new(detectors.entity_mention.clone(), cache);
        if let Some(source) = entity_source {
            entity = entity.with_source(source);
        }

        let mut registry = Self::new();
        registry.register(Arc::new(ProjectSwitchDetector::new(
            detectors.project_switch.clone(),
            tracker,
        )));
        registry.register(Arc::new(KeywordDetector::new(&detectors.keyword)));
        registry.register(Arc::new(entity));
        registry.register(Arc::new(TokenThresholdDetector::new(
            &detectors.token_threshold,
        )));
        registry
    }

    /// Add a detector, replacing any detector with the same name in place.
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        let name = detector.name().to_string();
        match self.detectors.iter().position(|d| d.name() == name) {
            Some(i) => {
                self.detectors[i] = detector;
                debug!(detector = %name, "replaced detector");
            }
            None => {
                self.detectors.push(detector);
                debug!(detector = %name, "registered detector");
            }
        }
    }

    /// Remove a detector by name. Returns whether one was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.detectors.len();
        self.detectors.retain(|d| d.name() != name);
        self.detectors.len() != before
    }

    /// Look up a detector by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.iter().find(|d| d.name() == name).cloned()
    }

    /// Enabled detectors, ascending priority, ties in registration order.
    pub fn get_enabled_detectors(&self) -> Vec<Arc<dyn Detector>> {
        let mut enabled: Vec<Arc<dyn Detector>> = self
            .detectors
            .iter()
            .filter(|d| d.enabled())
            .cloned()
            .collect();
        // sort_by_key is stable
        enabled.sort_by_key(|d| d.priority());
        enabled
    }

    /// Names of all registered detectors, in registration order.
    pub fn list_detectors(&self) -> Vec<String> {
        self.detectors.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every enabled detector in priority order and collect triggers.
    pub fn evaluate_all(&self, prompt: &str, context: &DetectionContext) -> Vec<DetectorTrigger> {
        self.get_enabled_detectors()
            .iter()
            .filter_map(|detector| {
                let result = detector.evaluate(prompt, context)?;
                let name = detector.name().to_string();
                debug!(
                    detector = %name,
                    query_type = %result.query_type,
                    confidence = result.confidence,
                    "detector triggered"
                );
                metrics::counter!(telemetry::DETECTOR_TRIGGERS_TOTAL, "detector" => name.clone())
                    .increment(1);
                Some(DetectorTrigger {
                    detector: name,
                    result,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("detectors", &self.list_detectors())
            .finish()
    }
}
