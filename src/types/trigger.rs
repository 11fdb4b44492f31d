//! Trigger decision types returned by detectors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of memory query a trigger asks the caller to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Free-text search built from keyword context.
    KeywordSearch,
    /// Lookup of specific named entities.
    EntityDetails,
    /// Search for pending work once the session grows large.
    ThresholdCheck,
    /// Project-scoped context after a project switch.
    ProjectContext,
}

impl QueryType {
    /// Wire tag for this query type (e.g. `"keyword_search"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordSearch => "keyword_search",
            Self::EntityDetails => "entity_details",
            Self::ThresholdCheck => "threshold_check",
            Self::ProjectContext => "project_context",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detector's decision that a memory query should be issued.
///
/// Detectors return `Option<TriggerResult>`; a returned value always has
/// `triggered == true`. Confidence is clamped to `[0.0, 1.0]` on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub triggered: bool,
    /// How sure the detector is that the query is worth its cost.
    pub confidence: f64,
    /// Rough size of the memory query response, in tokens.
    pub estimated_tokens: u32,
    pub query_type: QueryType,
    /// Query-type specific parameters (e.g. `names`, `threshold`).
    #[serde(default)]
    pub query_params: Map<String, Value>,
    /// Human-readable explanation.
    pub reason: String,
}

impl TriggerResult {
    /// Create a triggered result with no query parameters.
    pub fn new(
        query_type: QueryType,
        confidence: f64,
        estimated_tokens: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            triggered: true,
            confidence: confidence.clamp(0.0, 1.0),
            estimated_tokens,
            query_type,
            query_params: Map::new(),
            reason: reason.into(),
        }
    }

    /// Add a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Look up a query parameter.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.query_params.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_triggered_and_clamped() {
        let result = TriggerResult::new(QueryType::KeywordSearch, 1.4, 150, "match");
        assert!(result.triggered);
        assert_eq!(result.confidence, 1.0);

        let result = TriggerResult::new(QueryType::KeywordSearch, -0.2, 150, "match");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn params_preserve_insertion_order() {
        let result = TriggerResult::new(QueryType::ThresholdCheck, 0.8, 175, "crossed")
            .with_param("threshold", 100_000)
            .with_param("current_count", 100_500);
        let keys: Vec<&str> = result.query_params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["threshold", "current_count"]);
        assert_eq!(result.param("threshold"), Some(&Value::from(100_000)));
    }

    #[test]
    fn query_type_serializes_as_tag() {
        let json = serde_json::to_string(&QueryType::EntityDetails).unwrap();
        assert_eq!(json, "\"entity_details\"");
        assert_eq!(QueryType::ProjectContext.to_string(), "project_context");
    }
}
