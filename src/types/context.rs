//! Ambient inputs handed to every detector alongside the prompt.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the project the user is currently working in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_remote_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
}

impl ProjectMetadata {
    /// Create metadata for a project rooted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            absolute_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the git remote URL.
    pub fn with_remote(mut self, url: impl Into<String>) -> Self {
        self.git_remote_url = Some(url.into());
        self
    }

    /// Set the checked-out git branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.git_branch = Some(branch.into());
        self
    }

    /// Name for display, `"Unknown"` when unset.
    pub fn display_name(&self) -> &str {
        non_empty(self.name.as_deref()).unwrap_or("Unknown")
    }

    /// Project root, if known and non-empty.
    pub fn path(&self) -> Option<&Path> {
        self.absolute_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Git remote URL, if known and non-empty.
    pub fn remote(&self) -> Option<&str> {
        non_empty(self.git_remote_url.as_deref())
    }

    /// Git branch, if known and non-empty.
    pub fn branch(&self) -> Option<&str> {
        non_empty(self.git_branch.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Per-evaluation context.
///
/// Each detector reads only the fields it needs. Unknown fields supplied by
/// callers are kept in `extra` so the context can be deserialized from a
/// loosely-shaped JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionContext {
    /// Tokens consumed so far in the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<i64>,
    /// Project the session is working in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_project: Option<ProjectMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetectionContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session token count.
    pub fn token_count(mut self, count: i64) -> Self {
        self.token_count = Some(count);
        self
    }

    /// Set the current project.
    pub fn project(mut self, project: ProjectMetadata) -> Self {
        self.current_project = Some(project);
        self
    }
}
