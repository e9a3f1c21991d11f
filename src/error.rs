//! Error types for the `itr` command-line front end.
//!
//! Domain failures come from [`issue_core::IssueError`] and pass through
//! unchanged; this enum only adds the workspace and configuration failures
//! that exist outside the core.

use std::path::PathBuf;

use issue_core::{ErrorKind, IssueError};
use thiserror::Error;

/// Errors raised by the CLI layer.
#[derive(Error, Debug)]
pub enum AppError {
    // === Workspace Errors ===
    /// No `.issues/` directory was found walking up from the working directory.
    #[error("Issue workspace not initialized: run 'itr init' first")]
    NotInitialized,

    /// `itr init` found an existing workspace.
    #[error("Issue workspace already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    // === Configuration Errors ===
    /// A configuration value is missing or out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `config.yaml` could not be parsed or written.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Check Errors ===
    /// `itr check` found problems in the data file.
    #[error("Check found {count} problem(s)")]
    CheckFailed { count: usize },

    // === I/O Errors ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Domain Errors ===
    #[error(transparent)]
    Core(#[from] IssueError),
}

impl AppError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Process exit code for this failure.
    ///
    /// Caller mistakes exit with 1, conflicts with 3, everything else with 2.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(err) => match err.kind() {
                ErrorKind::Validation | ErrorKind::NotFound => 1,
                ErrorKind::Conflict => 3,
                ErrorKind::Programming | ErrorKind::Internal => 2,
            },
            Self::NotInitialized
            | Self::AlreadyInitialized { .. }
            | Self::Config(_)
            | Self::CheckFailed { .. } => 1,
            Self::Yaml(_) | Self::Io(_) | Self::Json(_) => 2,
        }
    }
}

/// Result type using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
