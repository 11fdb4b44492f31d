//! Detector trait.
//!
//! A detector looks at one prompt plus its [`DetectionContext`] and decides
//! whether a memory query is worthwhile. Detectors are registered with the
//! [`DetectorRegistry`](super::DetectorRegistry) and run in ascending
//! priority order.
//!
//! # Contract
//!
//! - `evaluate` returns `None` when the detector has no opinion, including
//!   when its own collaborators fail. It never panics on odd input.
//! - `evaluate` depends only on its arguments and the detector's own state
//!   (entity cache, fired thresholds, project tracker).
//! - Detectors take `&self`; any mutable state uses interior locking so a
//!   detector can be shared as `Arc<dyn Detector>`.
//!
//! # Example
//!
//! ```
//! use muninn::detectors::Detector;
//! use muninn::{DetectionContext, QueryType, TriggerResult};
//!
//! struct Shouting;
//!
//! impl Detector for Shouting {
//!     fn name(&self) -> &str {
//!         "shouting"
//!     }
//!
//!     fn priority(&self) -> i32 {
//!         10
//!     }
//!
//!     fn evaluate(&self, prompt: &str, _context: &DetectionContext) -> Option<TriggerResult> {
//!         let loud = prompt.chars().any(char::is_alphabetic)
//!             && !prompt.chars().any(char::is_lowercase);
//!         loud.then(|| TriggerResult::new(QueryType::KeywordSearch, 0.5, 50, "all caps"))
//!     }
//! }
//!
//! assert!(Shouting.evaluate("WHY IS IT BROKEN", &DetectionContext::new()).is_some());
//! ```

use crate::types::{DetectionContext, TriggerResult};

/// A trigger policy over prompts and session context.
pub trait Detector: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn name(&self) -> &str;

    /// Evaluation order. Lower runs first.
    fn priority(&self) -> i32;

    /// Whether the registry should run this detector. Default: `true`.
    fn enabled(&self) -> bool {
        true
    }

    /// Decide whether `prompt` warrants a memory query.
    fn evaluate(&self, prompt: &str, context: &DetectionContext) -> Option<TriggerResult>;
}
