//! On-disk format of the memory cache.
//!
//! The cache is stored as a single pretty-printed JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entity_names": { "data": ["UserManager"], "last_refresh": "2026-01-05T10:00:00Z", "ttl_seconds": 300 },
//!   "query_cache": {
//!     "<sha256 hex of query>": { "result": {}, "timestamp": "...", "ttl_seconds": 600, "query": "..." }
//!   }
//! }
//! ```
//!
//! `query_cache` is order-preserving: least-recently-used first. Files
//! written before the `version` field existed are accepted as version 1.
//! Timestamps are written as RFC 3339; timestamps without an offset are read
//! as local time.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{MuninnError, Result};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Maximum supported on-disk format version.
const MAX_SUPPORTED_VERSION: u32 = 1;

/// The entity-names slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityNamesEntry {
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_optional_stamp")]
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ttl_seconds: u64,
}

impl EntityNamesEntry {
    /// Never-refreshed slot with the given TTL.
    pub fn empty(ttl_seconds: u64) -> Self {
        Self {
            data: Vec::new(),
            last_refresh: None,
            ttl_seconds,
        }
    }

    /// Slot holding `names`, refreshed at `now`.
    pub fn refreshed(names: Vec<String>, now: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            data: names,
            last_refresh: Some(now),
            ttl_seconds,
        }
    }

    /// Whether the slot has been refreshed and is within its TTL at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.last_refresh
            .is_some_and(|at| !is_expired(at, self.ttl_seconds, now))
    }

    /// Whether the slot was refreshed but its TTL has run out.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.last_refresh
            .is_some_and(|at| is_expired(at, self.ttl_seconds, now))
    }

    /// Whether there is any previous value to fall back on.
    pub fn has_value(&self) -> bool {
        self.last_refresh.is_some() || !self.data.is_empty()
    }
}

/// A cached query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub result: Value,
    #[serde(deserialize_with = "deserialize_stamp")]
    pub timestamp: DateTime<Utc>,
    pub ttl_seconds: u64,
    /// The original query text, kept for debugging.
    pub query: String,
}

impl QueryEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.timestamp, self.ttl_seconds, now)
    }
}

/// Full persisted cache state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub entity_names: EntityNamesEntry,
    #[serde(default)]
    pub query_cache: IndexMap<String, QueryEntry>,
}

impl CacheSnapshot {
    /// Empty snapshot at the current format version.
    pub fn empty(entity_ttl_seconds: u64) -> Self {
        Self {
            version: Some(FORMAT_VERSION),
            entity_names: EntityNamesEntry::empty(entity_ttl_seconds),
            query_cache: IndexMap::new(),
        }
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one as local time.
pub(crate) fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = raw.parse::<DateTime<Utc>>() {
        return Some(stamp);
    }
    let naive: NaiveDateTime = raw.parse().ok()?;
    Some(
        naive
            .and_local_timezone(Local)
            .earliest()
            .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc)),
    )
}

fn deserialize_stamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_stamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

fn deserialize_optional_stamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_stamp(&raw)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
        })
        .transpose()
}

/// `now > stamp + ttl`. A TTL too large to represent never expires.
pub(crate) fn is_expired(stamp: DateTime<Utc>, ttl_seconds: u64, now: DateTime<Utc>) -> bool {
    let deadline = i64::try_from(ttl_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| stamp.checked_add_signed(ttl));
    match deadline {
        Some(deadline) => now > deadline,
        None => false,
    }
}

/// Parse a snapshot, rejecting unsupported versions.
pub fn parse_snapshot(json: &str) -> Result<CacheSnapshot> {
    let snapshot: CacheSnapshot = serde_json::from_str(json)?;
    match snapshot.version {
        Some(v) if v > MAX_SUPPORTED_VERSION => Err(MuninnError::CorruptState(format!(
            "unsupported cache version {v} (max supported: {MAX_SUPPORTED_VERSION})"
        ))),
        _ => Ok(snapshot),
    }
}

/// Load a snapshot from disk.
///
/// Returns `None` on missing or corrupt file (logs a warning on corrupt).
pub fn load_snapshot(path: &Path) -> Option<CacheSnapshot> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read memory cache");
            return None;
        }
    };
    match parse_snapshot(&content) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt memory cache, starting fresh");
            None
        }
    }
}

/// Save a snapshot (atomic write via tmp + rename).
pub fn save_snapshot(path: &Path, snapshot: &CacheSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    write_atomic(path, &json)
}

/// Write `contents` to `path` through a sibling temp file, creating parent
/// directories as needed.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
