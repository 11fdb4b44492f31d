//! Active-project tracking.
//!
//! [`ProjectSwitchDetector`](crate::detectors::ProjectSwitchDetector) compares
//! the current project against the one recorded by a [`ProjectTracker`].
//! Two implementations ship with the crate:
//!
//! - [`InMemoryProjectTracker`]: process-local, for tests and embedding.
//! - [`FileProjectTracker`]: JSON file, survives restarts. Default location
//!   `~/.claude/active-project.json`.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::persist::write_atomic;
use crate::types::ProjectMetadata;
use crate::{MuninnError, Result};

/// The last project recorded as active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveProject {
    pub project: ProjectMetadata,
    #[serde(default)]
    pub has_uncommitted: bool,
    pub updated_at: DateTime<Utc>,
}

/// Stores the previously-active project across detector invocations.
pub trait ProjectTracker: Send + Sync {
    /// The last recorded project, if any.
    fn get_active_project(&self) -> Option<ActiveProject>;

    /// Record `project` as active (also refreshes `updated_at`).
    fn set_active_project(&self, project: &ProjectMetadata, has_uncommitted: bool) -> Result<()>;

    /// Whether the working tree at `path` has uncommitted changes.
    ///
    /// Default: `false`.
    fn has_uncommitted_changes(&self, _path: &Path) -> bool {
        false
    }
}

/// Process-local tracker.
#[derive(Debug, Default)]
pub struct InMemoryProjectTracker {
    active: Mutex<Option<ActiveProject>>,
}

impl InMemoryProjectTracker {
    /// Create a tracker with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that already has `project` recorded.
    pub fn with_active(project: ProjectMetadata) -> Self {
        Self {
            active: Mutex::new(Some(ActiveProject {
                project,
                has_uncommitted: false,
                updated_at: Utc::now(),
            })),
        }
    }
}

impl ProjectTracker for InMemoryProjectTracker {
    fn get_active_project(&self) -> Option<ActiveProject> {
        self.active.lock().clone()
    }

    fn set_active_project(&self, project: &ProjectMetadata, has_uncommitted: bool) -> Result<()> {
        *self.active.lock() = Some(ActiveProject {
            project: project.clone(),
            has_uncommitted,
            updated_at: Utc::now(),
        });
        Ok(())
    }
}

/// JSON-file backed tracker.
///
/// A missing or corrupt file reads as "nothing recorded". Uncommitted
/// changes are detected with `git status --porcelain`.
#[derive(Debug)]
pub struct FileProjectTracker {
    path: PathBuf,
    // Serializes read-modify-write of the file within this process.
    lock: Mutex<()>,
}

impl FileProjectTracker {
    /// Tracker backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileProjectTracker {
    fn default() -> Self {
        Self::new(default_tracker_path())
    }
}

/// Default tracker path: `~/.claude/active-project.json`.
pub fn default_tracker_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("active-project.json")
}

impl ProjectTracker for FileProjectTracker {
    fn get_active_project(&self) -> Option<ActiveProject> {
        let _guard = self.lock.lock();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read project tracker");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(active) => Some(active),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt project tracker state");
                None
            }
        }
    }

    fn set_active_project(&self, project: &ProjectMetadata, has_uncommitted: bool) -> Result<()> {
        let _guard = self.lock.lock();
        let active = ActiveProject {
            project: project.clone(),
            has_uncommitted,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&active)?;
        write_atomic(&self.path, &json).map_err(|e| {
            MuninnError::Tracker(format!(
                "failed to write {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(project = project.display_name(), "recorded active project");
        Ok(())
    }

    fn has_uncommitted_changes(&self, path: &Path) -> bool {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .args(["status", "--porcelain"])
            .output();
        match output {
            Ok(out) if out.status.success() => !out.stdout.iter().all(u8::is_ascii_whitespace),
            Ok(_) => false,
            Err(e) => {
                debug!(error = %e, "git unavailable for uncommitted-change check");
                false
            }
        }
    }
}
