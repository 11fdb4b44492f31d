//! Muninn - memory triggers for coding-assistant sessions
//!
//! This crate decides *when* a session should consult its long-term memory
//! graph. A set of [`Detector`]s score each incoming prompt (project
//! switches, recall keywords, known-entity mentions, token-budget
//! thresholds) and a persistent two-tier [`MemoryCache`] keeps entity names
//! and query results across process runs.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use muninn::detectors::DetectorRegistry;
//! use muninn::project::InMemoryProjectTracker;
//! use muninn::{CacheConfig, Config, DetectionContext, MemoryCache, QueryType};
//!
//! let dir = tempfile::tempdir()?;
//! let cache = Arc::new(MemoryCache::new(
//!     &CacheConfig::new().path(dir.path().join("memory-cache.json")),
//! ));
//! cache.cache_entity_names(vec!["UserManager".to_string()]);
//!
//! let registry = DetectorRegistry::from_config(
//!     &Config::default(),
//!     cache,
//!     Arc::new(InMemoryProjectTracker::new()),
//!     None,
//! );
//!
//! let triggers = registry.evaluate_all("What is UserManager?", &DetectionContext::new());
//! assert_eq!(triggers.len(), 1);
//! assert_eq!(triggers[0].result.query_type, QueryType::EntityDetails);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod detectors;
pub mod error;
pub mod project;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats, MemoryCache};
pub use config::Config;
pub use detectors::{Detector, DetectorRegistry};
pub use error::{MuninnError, Result};
pub use types::{DetectionContext, ProjectMetadata, QueryType, TriggerResult};
