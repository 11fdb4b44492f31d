//! Memory-trigger detectors.
//!
//! Each [`Detector`] scores one prompt and returns at most one
//! [`TriggerResult`](crate::TriggerResult). The standard set, in default
//! priority order:
//!
//! | priority | detector | query type |
//! |---|---|---|
//! | 1 | [`ProjectSwitchDetector`] | `project_context` |
//! | 2 | [`KeywordDetector`] | `keyword_search` |
//! | 3 | [`EntityMentionDetector`] | `entity_details` |
//! | 4 | [`TokenThresholdDetector`] | `threshold_check` |
//!
//! [`DetectorRegistry`] holds detectors and runs the enabled ones in order.

mod entity;
mod heuristics;
mod keyword;
mod project;
mod registry;
mod token;
mod traits;

pub use entity::{
    ENTITY_MENTION_DETECTOR, EntityMatch, EntityMentionConfig, EntityMentionDetector,
    EntitySource, MatchKind,
};
pub use keyword::{KEYWORD_DETECTOR, KeywordConfig, KeywordDetector};
pub use project::{
    PROJECT_SWITCH_DETECTOR, ProjectSwitchConfig, ProjectSwitchDetector, SwitchType,
};
pub use registry::{DetectorRegistry, DetectorTrigger};
pub use token::{
    DEFAULT_THRESHOLDS, PENDING_WORK_TERMS, TOKEN_THRESHOLD_DETECTOR, TokenThresholdConfig,
    TokenThresholdDetector,
};
pub use traits::Detector;
