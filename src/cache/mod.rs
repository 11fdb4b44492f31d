//! Persistent two-tier memory cache.
//!
//! [`MemoryCache`] holds two independent tiers behind one lock:
//!
//! - **Entity names**: a single TTL-bounded list of known entity names
//!   (default TTL 5 minutes), refreshed wholesale from a caller-supplied
//!   callback when stale.
//! - **Query results**: a bounded map from `sha256(query)` to a cached
//!   result with its own TTL (default 10 minutes). Ordered least- to
//!   most-recently-used; inserting past the bound evicts from the front.
//!
//! Every state change is written to a JSON file (see [`persist`]) so the
//! cache survives process restarts. Persistence failures are logged and
//! ignored: the in-memory state stays authoritative.
//!
//! All public operations take the lock for their full duration, including
//! the entity refresh callback and the file write.

pub mod persist;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::telemetry;
use crate::{MuninnError, Result};

pub use persist::{CacheSnapshot, EntityNamesEntry, QueryEntry};

/// Default maximum number of cached query results.
pub const DEFAULT_MAX_QUERY_ENTRIES: usize = 100;

/// Default TTL of the entity-names slot.
pub const DEFAULT_ENTITY_TTL: Duration = Duration::from_secs(300);

/// Default TTL of a cached query result.
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(600);

/// Refresh callback for the entity-names slot.
pub type RefreshFn<'a> = &'a dyn Fn() -> Result<Vec<String>>;

/// Configuration for [`MemoryCache`].
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .path("/tmp/memory-cache.json")
///     .max_query_entries(50)
///     .query_ttl(Duration::from_secs(120));
/// assert_eq!(config.max_query_entries, 50);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Backing file. Default: `~/.claude/memory-cache.json`.
    pub path: PathBuf,
    /// Maximum number of cached query results. Default: 100.
    pub max_query_entries: usize,
    /// TTL of the entity-names slot. Default: 5 minutes.
    pub entity_ttl: Duration,
    /// Default TTL of cached query results. Default: 10 minutes.
    pub query_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            max_query_entries: DEFAULT_MAX_QUERY_ENTRIES,
            entity_ttl: DEFAULT_ENTITY_TTL,
            query_ttl: DEFAULT_QUERY_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backing file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the maximum number of cached query results.
    pub fn max_query_entries(mut self, n: usize) -> Self {
        self.max_query_entries = n;
        self
    }

    /// Set the TTL of the entity-names slot.
    pub fn entity_ttl(mut self, ttl: Duration) -> Self {
        self.entity_ttl = ttl;
        self
    }

    /// Set the default TTL of cached query results.
    pub fn query_ttl(mut self, ttl: Duration) -> Self {
        self.query_ttl = ttl;
        self
    }
}

/// Default cache path: `~/.claude/memory-cache.json`.
pub fn default_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("memory-cache.json")
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub entity_names_count: usize,
    pub entity_names_valid: bool,
    pub entity_names_last_refresh: Option<DateTime<Utc>>,
    pub query_cache_count: usize,
    pub query_cache_max_size: usize,
    pub storage_location: PathBuf,
}

/// Outcome of an entity-names refresh attempt.
enum RefreshOutcome {
    Fresh(Vec<String>),
    /// Refresh failed; serving the previous value.
    Stale(Vec<String>),
    Failed(MuninnError),
}

impl RefreshOutcome {
    fn into_result(self) -> Result<Vec<String>> {
        match self {
            Self::Fresh(names) | Self::Stale(names) => Ok(names),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Thread-safe, file-backed two-tier cache. See module docs.
pub struct MemoryCache {
    state: Mutex<CacheSnapshot>,
    path: PathBuf,
    max_query_entries: usize,
    entity_ttl_secs: u64,
    query_ttl_secs: u64,
}

impl MemoryCache {
    /// Open the cache described by `config`, loading any persisted state.
    ///
    /// A missing or corrupt file yields an empty cache. Expired entries in
    /// the loaded state are swept immediately.
    pub fn new(config: &CacheConfig) -> Self {
        let entity_ttl_secs = config.entity_ttl.as_secs();
        let mut snapshot = persist::load_snapshot(&config.path)
            .unwrap_or_else(|| CacheSnapshot::empty(entity_ttl_secs));
        // Legacy files are rewritten at the current version.
        snapshot.version = Some(persist::FORMAT_VERSION);

        let cache = Self {
            state: Mutex::new(snapshot),
            path: config.path.clone(),
            max_query_entries: config.max_query_entries,
            entity_ttl_secs,
            query_ttl_secs: config.query_ttl.as_secs(),
        };

        {
            let mut state = cache.state.lock();
            let evicted = cache.enforce_bound(&mut state);
            let expired = sweep_expired(&mut state, Utc::now());
            if evicted + expired > 0 {
                debug!(evicted, expired, "pruned loaded memory cache");
                cache.persist(&state);
            }
        }
        cache
    }

    /// Open a cache at `path` with default settings.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(&CacheConfig::new().path(path))
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the cached entity names, refreshing them if needed.
    ///
    /// `refresh` is invoked when `force_refresh` is set, when the slot was
    /// never refreshed, or when its TTL has run out. Without a `refresh`
    /// callback the current (possibly stale or empty) list is returned.
    ///
    /// If `refresh` fails and a previous value exists, the previous value is
    /// returned. The error is propagated only when there is nothing to fall
    /// back on.
    ///
    /// `refresh` runs with the cache lock held and must not call back into
    /// this cache.
    pub fn get_entity_names(
        &self,
        refresh: Option<RefreshFn<'_>>,
        force_refresh: bool,
    ) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let needs_refresh = force_refresh || !state.entity_names.is_fresh(Utc::now());

        let refresh = match refresh {
            Some(refresh) if needs_refresh => refresh,
            _ => {
                let tier = telemetry::TIER_ENTITY_NAMES;
                if needs_refresh {
                    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "tier" => tier).increment(1);
                } else {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
                }
                return Ok(state.entity_names.data.clone());
            }
        };

        let outcome = match refresh() {
            Ok(names) => {
                state.entity_names =
                    EntityNamesEntry::refreshed(names.clone(), Utc::now(), self.entity_ttl_secs);
                self.persist(&state);
                debug!(count = names.len(), "refreshed entity names");
                RefreshOutcome::Fresh(names)
            }
            Err(e) if state.entity_names.has_value() => {
                warn!(error = %e, "entity refresh failed, serving cached names");
                RefreshOutcome::Stale(state.entity_names.data.clone())
            }
            Err(e) => {
                warn!(error = %e, "entity refresh failed with no cached names");
                RefreshOutcome::Failed(e)
            }
        };

        let status = match &outcome {
            RefreshOutcome::Fresh(_) => "ok",
            RefreshOutcome::Stale(_) => "stale",
            RefreshOutcome::Failed(_) => "error",
        };
        metrics::counter!(telemetry::ENTITY_REFRESH_TOTAL, "status" => status).increment(1);

        outcome.into_result()
    }

    /// Replace the entity-names slot with `names`, stamped now.
    pub fn cache_entity_names(&self, names: Vec<String>) {
        let mut state = self.state.lock();
        state.entity_names = EntityNamesEntry::refreshed(names, Utc::now(), self.entity_ttl_secs);
        self.persist(&state);
    }

    /// Cache a query result with the default query TTL.
    pub fn cache_query_result(&self, query: &str, result: Value) {
        self.insert_query(query, result, self.query_ttl_secs);
    }

    /// Cache a query result with an explicit TTL.
    pub fn cache_query_result_with_ttl(&self, query: &str, result: Value, ttl: Duration) {
        self.insert_query(query, result, ttl.as_secs());
    }

    fn insert_query(&self, query: &str, result: Value, ttl_seconds: u64) {
        let key = hash_query(query);
        let mut state = self.state.lock();

        // Re-inserting moves the key to the most-recently-used end.
        state.query_cache.shift_remove(&key);
        state.query_cache.insert(
            key,
            QueryEntry {
                result,
                timestamp: Utc::now(),
                ttl_seconds,
                query: query.to_string(),
            },
        );
        self.enforce_bound(&mut state);
        self.persist(&state);
    }

    /// Look up a cached query result.
    ///
    /// An expired entry is removed and reported as a miss. A hit moves the
    /// entry to the most-recently-used position.
    pub fn get_cached_query(&self, query: &str) -> Option<Value> {
        let key = hash_query(query);
        let mut state = self.state.lock();
        let tier = telemetry::TIER_QUERY;

        let Some(entry) = state.query_cache.shift_remove(&key) else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "tier" => tier).increment(1);
            return None;
        };

        if entry.is_expired(Utc::now()) {
            debug!(query = %entry.query, "cached query expired");
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "tier" => tier).increment(1);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "expired")
                .increment(1);
            self.persist(&state);
            return None;
        }

        let result = entry.result.clone();
        state.query_cache.insert(key, entry);
        // LRU order is part of the persisted state.
        self.persist(&state);
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
        Some(result)
    }

    /// Remove expired entries from both tiers.
    ///
    /// A stale entity-names slot is reset to never-refreshed. Returns the
    /// number of entries removed (the slot counts as one).
    pub fn clear_expired(&self) -> usize {
        let mut state = self.state.lock();
        let removed = sweep_expired(&mut state, Utc::now());
        if removed > 0 {
            debug!(removed, "cleared expired cache entries");
            self.persist(&state);
        }
        removed
    }

    /// Reset both tiers to empty.
    pub fn clear_all(&self) {
        let mut state = self.state.lock();
        *state = CacheSnapshot::empty(self.entity_ttl_secs);
        self.persist(&state);
        info!(path = %self.path.display(), "cleared memory cache");
    }

    /// Current statistics.
    pub fn get_stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entity_names_count: state.entity_names.data.len(),
            entity_names_valid: state.entity_names.is_fresh(Utc::now()),
            entity_names_last_refresh: state.entity_names.last_refresh,
            query_cache_count: state.query_cache.len(),
            query_cache_max_size: self.max_query_entries,
            storage_location: self.path.clone(),
        }
    }

    /// Evict least-recently-used query entries until within bound.
    fn enforce_bound(&self, state: &mut CacheSnapshot) -> usize {
        let mut evicted = 0;
        while state.query_cache.len() > self.max_query_entries {
            if let Some((_, entry)) = state.query_cache.shift_remove_index(0) {
                debug!(query = %entry.query, "evicted least-recently-used query");
                evicted += 1;
            }
        }
        if evicted > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "lru")
                .increment(evicted as u64);
        }
        evicted
    }

    fn persist(&self, state: &CacheSnapshot) {
        if let Err(e) = persist::save_snapshot(&self.path, state) {
            warn!(path = %self.path.display(), error = %e, "failed to save memory cache");
        }
    }
}

/// Drop expired entries in place. Returns how many were removed.
fn sweep_expired(state: &mut CacheSnapshot, now: DateTime<Utc>) -> usize {
    let mut removed = 0;

    if state.entity_names.is_stale(now) {
        state.entity_names.data.clear();
        state.entity_names.last_refresh = None;
        removed += 1;
    }

    let before = state.query_cache.len();
    state.query_cache.retain(|_, entry| !entry.is_expired(now));
    let expired = before - state.query_cache.len();
    if expired > 0 {
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "expired")
            .increment(expired as u64);
    }

    removed + expired
}

/// Stable cache key: lowercase hex SHA-256 of the UTF-8 query.
pub fn hash_query(query: &str) -> String {
    format!("{:x}", Sha256::digest(query.as_bytes()))
}
