//! Public types for the Muninn API.

mod context;
mod trigger;

pub use context::{DetectionContext, ProjectMetadata};
pub use trigger::{QueryType, TriggerResult};
