//! Project switch detector.
//!
//! Compares the project in the current [`DetectionContext`] with the last
//! one recorded by a [`ProjectTracker`] and triggers a project-context
//! query when the user has moved to a different project. Checks run in
//! order and the first hit wins:
//!
//! 1. different resolved directory → [`SwitchType::Directory`] (0.95)
//! 2. different normalized git remote → [`SwitchType::Remote`] (0.90)
//! 3. branch change involving a major branch → [`SwitchType::Branch`] (0.75)
//!
//! The tracker is updated on every evaluation that carries a project.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::heuristics::round_confidence;
use super::traits::Detector;
use crate::project::ProjectTracker;
use crate::types::{DetectionContext, ProjectMetadata, QueryType, TriggerResult};

/// Registry name of [`ProjectSwitchDetector`].
pub const PROJECT_SWITCH_DETECTOR: &str = "project_switch_detector";

const ESTIMATED_TOKENS: u32 = 200;
const MAX_REMOTE_DISPLAY_CHARS: usize = 50;

static KNOWN_HOSTS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ["github.com", "gitlab.com", "bitbucket.org"]
        .into_iter()
        .map(|host| {
            let pattern = format!(r"{}[:/](.+?)(?:\.git)?$", regex::escape(host));
            (host, Regex::new(&pattern).expect("valid regex literal"))
        })
        .collect()
});

/// Configuration for [`ProjectSwitchDetector`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectSwitchConfig {
    /// Default: 1 (runs first).
    pub priority: i32,
    pub enabled: bool,
    /// Whether branch changes count as switches. Default: true.
    pub detect_branch_switch: bool,
    /// A branch change only counts when one side is in this set.
    pub major_branches: Vec<String>,
}

impl Default for ProjectSwitchConfig {
    fn default() -> Self {
        Self {
            priority: 1,
            enabled: true,
            detect_branch_switch: true,
            major_branches: ["main", "master", "develop", "development"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// What changed between the previous and the current project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchType {
    Directory,
    Remote,
    Branch,
}

impl SwitchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Remote => "remote",
            Self::Branch => "branch",
        }
    }

    fn base_confidence(&self) -> f64 {
        match self {
            Self::Directory => 0.95,
            Self::Remote => 0.90,
            Self::Branch => 0.75,
        }
    }
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected switch with the details needed for the reason string.
#[derive(Debug, Clone, PartialEq)]
enum ProjectSwitch {
    Directory { from: String, to: String },
    Remote { from: String, to: String },
    Branch { project: String, from: String, to: String },
}

impl ProjectSwitch {
    fn switch_type(&self) -> SwitchType {
        match self {
            Self::Directory { .. } => SwitchType::Directory,
            Self::Remote { .. } => SwitchType::Remote,
            Self::Branch { .. } => SwitchType::Branch,
        }
    }

    fn reason(&self) -> String {
        match self {
            Self::Directory { from, to } => format!("Switched projects: {from} -> {to}"),
            Self::Remote { from, to } => format!(
                "Changed git remote: {} -> {}",
                shorten_remote_url(from),
                shorten_remote_url(to)
            ),
            Self::Branch { project, from, to } => {
                format!("Switched branch in {project}: {from} -> {to}")
            }
        }
    }
}

/// Detects switches between projects.
pub struct ProjectSwitchDetector {
    config: ProjectSwitchConfig,
    tracker: Arc<dyn ProjectTracker>,
}

impl ProjectSwitchDetector {
    pub fn new(config: ProjectSwitchConfig, tracker: Arc<dyn ProjectTracker>) -> Self {
        Self { config, tracker }
    }

    pub fn config(&self) -> &ProjectSwitchConfig {
        &self.config
    }

    fn detect_switch(
        &self,
        current: &ProjectMetadata,
        previous: &ProjectMetadata,
    ) -> Option<ProjectSwitch> {
        if let (Some(cur), Some(prev)) = (current.path(), previous.path()) {
            if resolve(cur) != resolve(prev) {
                return Some(ProjectSwitch::Directory {
                    from: previous.display_name().to_string(),
                    to: current.display_name().to_string(),
                });
            }
        }

        if let (Some(cur), Some(prev)) = (current.remote(), previous.remote()) {
            if normalize_remote(cur) != normalize_remote(prev) {
                return Some(ProjectSwitch::Remote {
                    from: prev.to_string(),
                    to: cur.to_string(),
                });
            }
        }

        if self.config.detect_branch_switch {
            if let (Some(cur), Some(prev)) = (current.branch(), previous.branch()) {
                if cur != prev && (self.is_major(cur) || self.is_major(prev)) {
                    return Some(ProjectSwitch::Branch {
                        project: current.display_name().to_string(),
                        from: prev.to_string(),
                        to: cur.to_string(),
                    });
                }
            }
        }

        None
    }

    fn is_major(&self, branch: &str) -> bool {
        self.config.major_branches.iter().any(|b| b == branch)
    }

    /// Record `project` as active. Failures are logged, never propagated.
    fn record(&self, project: &ProjectMetadata) {
        let has_uncommitted = project
            .path()
            .is_some_and(|path| self.tracker.has_uncommitted_changes(path));
        if let Err(e) = self.tracker.set_active_project(project, has_uncommitted) {
            warn!(error = %e, "could not update project tracker");
        }
    }
}

impl Detector for ProjectSwitchDetector {
    fn name(&self) -> &str {
        PROJECT_SWITCH_DETECTOR
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn evaluate(&self, _prompt: &str, context: &DetectionContext) -> Option<TriggerResult> {
        let current = context.current_project.as_ref()?;

        let Some(active) = self.tracker.get_active_project() else {
            debug!(project = current.display_name(), "first project seen, recording");
            self.record(current);
            return None;
        };

        let switch = self.detect_switch(current, &active.project);
        // Refreshes the tracker timestamp when nothing changed.
        self.record(current);
        let switch = switch?;

        let switch_type = switch.switch_type();
        let mut confidence = switch_type.base_confidence();
        if current.remote().is_some() {
            confidence = (confidence + 0.05).min(1.0);
        }

        let project_path = current
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Some(
            TriggerResult::new(
                QueryType::ProjectContext,
                round_confidence(confidence),
                ESTIMATED_TOKENS,
                switch.reason(),
            )
            .with_param("project", current.display_name())
            .with_param("project_path", project_path)
            .with_param("git_remote", current.remote().unwrap_or_default())
            .with_param("branch", current.branch().unwrap_or_default())
            .with_param("switch_type", switch_type.as_str()),
        )
    }
}

/// Canonical form of `path`. A path that does not exist is made absolute
/// against the working directory instead.
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Strip a trailing `.git` and upgrade `http://` to `https://`.
fn normalize_remote(url: &str) -> String {
    url.strip_suffix(".git")
        .unwrap_or(url)
        .replace("http://", "https://")
}

/// Short display form of a remote URL (`github.com/owner/repo`).
fn shorten_remote_url(url: &str) -> String {
    for (host, re) in KNOWN_HOSTS.iter() {
        if url.contains(host) {
            if let Some(path) = re.captures(url).and_then(|c| c.get(1)) {
                return format!("{host}/{}", path.as_str());
            }
            break;
        }
    }

    let len = url.chars().count();
    if len > MAX_REMOTE_DISPLAY_CHARS {
        url.chars().skip(len - MAX_REMOTE_DISPLAY_CHARS).collect()
    } else {
        url.to_string()
    }
}
