//! Configuration loading.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. explicit path (must exist)
//! 2. `~/.muninn/config.toml` (user)
//! 3. `/etc/muninn/config.toml` (system)
//! 4. built-in defaults
//!
//! Every field is optional.
//!
//! ```toml
//! [cache]
//! path = "~/.claude/memory-cache.json"
//! max_query_entries = 100
//! entity_ttl_secs = 300
//! query_ttl_secs = 600
//!
//! [detectors.keyword]
//! priority = 2
//!
//! [detectors.token_threshold]
//! thresholds = [100000, 150000]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::{
    CacheConfig, DEFAULT_ENTITY_TTL, DEFAULT_MAX_QUERY_ENTRIES, DEFAULT_QUERY_TTL,
    default_cache_path,
};
use crate::detectors::{
    EntityMentionConfig, KeywordConfig, ProjectSwitchConfig, TokenThresholdConfig,
};
use crate::{MuninnError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub detectors: DetectorsConfig,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Backing file; a leading `~/` expands to the home directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Maximum cached query results (default: 100).
    #[serde(default = "default_max_query_entries")]
    pub max_query_entries: usize,
    /// Entity-names TTL in seconds (default: 300).
    #[serde(default = "default_entity_ttl_secs")]
    pub entity_ttl_secs: u64,
    /// Default query-result TTL in seconds (default: 600).
    #[serde(default = "default_query_ttl_secs")]
    pub query_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: None,
            max_query_entries: default_max_query_entries(),
            entity_ttl_secs: default_entity_ttl_secs(),
            query_ttl_secs: default_query_ttl_secs(),
        }
    }
}

fn default_max_query_entries() -> usize {
    DEFAULT_MAX_QUERY_ENTRIES
}

fn default_entity_ttl_secs() -> u64 {
    DEFAULT_ENTITY_TTL.as_secs()
}

fn default_query_ttl_secs() -> u64 {
    DEFAULT_QUERY_TTL.as_secs()
}

impl CacheSection {
    /// The equivalent [`CacheConfig`].
    pub fn to_cache_config(&self) -> CacheConfig {
        let path = self
            .path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(default_cache_path);
        CacheConfig::new()
            .path(path)
            .max_query_entries(self.max_query_entries)
            .entity_ttl(Duration::from_secs(self.entity_ttl_secs))
            .query_ttl(Duration::from_secs(self.query_ttl_secs))
    }
}

/// `[detectors.*]` sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectorsConfig {
    #[serde(default)]
    pub project_switch: ProjectSwitchConfig,
    #[serde(default)]
    pub keyword: KeywordConfig,
    #[serde(default)]
    pub entity_mention: EntityMentionConfig,
    #[serde(default)]
    pub token_threshold: TokenThresholdConfig,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Falls back to defaults when no file exists. A file that exists but
    /// cannot be read or parsed is a [`MuninnError::Configuration`].
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit_path)? else {
            debug!("no config file found, using defaults");
            return Ok(Self::default());
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| MuninnError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.detectors.entity_mention.partial_match_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MuninnError::Configuration(format!(
                "detectors.entity_mention.partial_match_threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(())
    }

    /// Resolve the config file path, `None` when no file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".muninn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/muninn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.cache.max_query_entries, 100);
        assert_eq!(config.cache.entity_ttl_secs, 300);
        assert_eq!(config.cache.query_ttl_secs, 600);
        assert!(config.cache.path.is_none());
        assert_eq!(config.detectors.project_switch.priority, 1);
        assert_eq!(config.detectors.keyword.priority, 2);
        assert_eq!(config.detectors.entity_mention.priority, 3);
        assert_eq!(config.detectors.token_threshold.priority, 4);
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_home(Path::new("~/.claude/cache.json")),
            home.join(".claude/cache.json")
        );
        assert_eq!(
            expand_home(Path::new("/var/cache.json")),
            PathBuf::from("/var/cache.json")
        );
    }

    #[test]
    fn missing_explicit_path_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/muninn.toml"))).unwrap_err();
        assert!(matches!(err, MuninnError::Configuration(_)));
    }
}
