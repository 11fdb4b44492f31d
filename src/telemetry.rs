//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `tier`: cache tier, "entity_names" or "query"
//! - `reason`: eviction cause, "lru" or "expired"
//! - `status`: entity refresh outcome, "ok", "stale" or "error"
//! - `detector`: detector name (e.g. "keyword_detector")

/// Total cache hits.
///
/// Labels: `tier`.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total cache misses (absent or expired).
///
/// Labels: `tier`.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total query-cache entries dropped.
///
/// Labels: `reason` ("lru" | "expired").
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";

/// Total entity-name refresh attempts.
///
/// Labels: `status` ("ok" | "stale" | "error").
pub const ENTITY_REFRESH_TOTAL: &str = "muninn_entity_refresh_total";

/// Total trigger decisions produced by detectors run through the registry.
///
/// Labels: `detector`.
pub const DETECTOR_TRIGGERS_TOTAL: &str = "muninn_detector_triggers_total";

/// Label values for the `tier` label.
pub(crate) const TIER_ENTITY_NAMES: &str = "entity_names";
pub(crate) const TIER_QUERY: &str = "query";
