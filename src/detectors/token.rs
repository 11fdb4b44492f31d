//! Token threshold detector.
//!
//! Fires once per configured threshold when the session token count
//! crosses it, prompting a search for pending work before the context
//! window fills up. Fired thresholds are remembered until
//! [`TokenThresholdDetector::reset_state`] is called; the set is in-memory
//! only and starts empty in every process.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use super::heuristics::{group_thousands, round_confidence};
use super::traits::Detector;
use crate::types::{DetectionContext, QueryType, TriggerResult};

/// Registry name of [`TokenThresholdDetector`].
pub const TOKEN_THRESHOLD_DETECTOR: &str = "token_threshold_detector";

/// Default thresholds, in tokens.
pub const DEFAULT_THRESHOLDS: [u64; 2] = [100_000, 150_000];

/// Terms the caller should search memory for.
pub const PENDING_WORK_TERMS: [&str; 4] = ["pending", "incomplete", "TODO", "in progress"];

const ESTIMATED_TOKENS: u32 = 175;
const OVERAGE_BONUS_TOKENS: u64 = 10_000;

/// Configuration for [`TokenThresholdDetector`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenThresholdConfig {
    /// Default: 4.
    pub priority: i32,
    pub enabled: bool,
    /// Token counts that trigger a check. Sorted on construction.
    pub thresholds: Vec<u64>,
}

impl Default for TokenThresholdConfig {
    fn default() -> Self {
        Self {
            priority: 4,
            enabled: true,
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

/// Detects token-count threshold crossings, one-shot per threshold.
pub struct TokenThresholdDetector {
    priority: i32,
    enabled: bool,
    thresholds: Vec<u64>,
    fired: Mutex<BTreeSet<u64>>,
}

impl TokenThresholdDetector {
    pub fn new(config: &TokenThresholdConfig) -> Self {
        let mut thresholds = config.thresholds.clone();
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            priority: config.priority,
            enabled: config.enabled,
            thresholds,
            fired: Mutex::new(BTreeSet::new()),
        }
    }

    /// Configured thresholds, ascending.
    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    /// Thresholds that have fired since construction or the last reset, ascending.
    pub fn triggered_thresholds(&self) -> Vec<u64> {
        self.fired.lock().iter().copied().collect()
    }

    /// Forget fired thresholds so they can trigger again (new session).
    pub fn reset_state(&self) {
        self.fired.lock().clear();
        debug!("token threshold state reset");
    }
}

impl Default for TokenThresholdDetector {
    fn default() -> Self {
        Self::new(&TokenThresholdConfig::default())
    }
}

impl Detector for TokenThresholdDetector {
    fn name(&self) -> &str {
        TOKEN_THRESHOLD_DETECTOR
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn evaluate(&self, _prompt: &str, context: &DetectionContext) -> Option<TriggerResult> {
        let token_count = u64::try_from(context.token_count.unwrap_or(0))
            .ok()
            .filter(|&count| count > 0)?;

        // Check-and-mark under one lock so a threshold cannot fire twice.
        let threshold = {
            let mut fired = self.fired.lock();
            let threshold = self
                .thresholds
                .iter()
                .copied()
                .filter(|t| !fired.contains(t))
                .find(|&t| token_count >= t)?;
            fired.insert(threshold);
            threshold
        };

        Some(
            TriggerResult::new(
                QueryType::ThresholdCheck,
                threshold_confidence(token_count, threshold),
                ESTIMATED_TOKENS,
                format!(
                    "Token count ({}) crossed threshold {}",
                    group_thousands(token_count),
                    group_thousands(threshold)
                ),
            )
            .with_param("threshold", threshold)
            .with_param("current_count", token_count)
            .with_param("search_terms", PENDING_WORK_TERMS.to_vec()),
        )
    }
}

fn threshold_confidence(token_count: u64, threshold: u64) -> f64 {
    let mut confidence: f64 = if threshold >= 150_000 {
        0.9
    } else if threshold >= 100_000 {
        0.8
    } else {
        0.7
    };
    if token_count - threshold > OVERAGE_BONUS_TOKENS {
        confidence = (confidence + 0.1).min(1.0);
    }
    round_confidence(confidence)
}
