//! Muninn error types

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    /// The entity refresh callback failed and no cached names were available
    /// to fall back on.
    #[error("entity refresh failed: {0}")]
    Refresh(String),

    // Storage errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Persisted state exists but cannot be used (unsupported version, bad shape).
    #[error("corrupt state: {0}")]
    CorruptState(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Collaborator errors
    #[error("project tracker error: {0}")]
    Tracker(String),
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
