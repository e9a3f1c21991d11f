//! Error types for `issue-core`.
//!
//! Every failure a collaborator can observe is one variant of `IssueError`.
//! Adapters use [`IssueError::kind`] to map a failure onto their own
//! response taxonomy (bad request, conflict, not found, internal).

use std::path::PathBuf;
use thiserror::Error;

use crate::workflow::{CommandKind, IssueState};

/// Primary error type for issue-core operations.
#[derive(Error, Debug)]
pub enum IssueError {
    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// Attempted to add an issue with an ID that already exists.
    #[error("Issue ID collision: {id}")]
    IdCollision { id: String },

    /// Issue ID format is invalid.
    #[error("Invalid issue ID format: {id}")]
    InvalidId { id: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    // === Workflow Errors ===
    /// The transition table rejected the command for the current state.
    #[error("Cannot execute '{command}' on {id} while in state '{state}'")]
    StateConflict {
        id: String,
        state: IssueState,
        command: CommandKind,
    },

    // === Concurrency Errors ===
    /// The stored aggregate changed since it was read.
    #[error("Concurrency conflict on {id}: issue was modified by another writer")]
    ConcurrencyConflict { id: String },

    // === Specification Errors ===
    /// A predicate or selector could not be expressed in the query algebra.
    #[error("Invalid specification: {reason}")]
    InvalidSpecification { reason: String },

    // === Query Errors ===
    /// The caller cancelled a running query.
    #[error("Query cancelled")]
    Cancelled,

    // === JSONL Errors ===
    /// Failed to parse a line in the JSONL file.
    #[error("JSONL parse error at line {line}: {reason}")]
    JsonlParse { line: usize, reason: String },

    // === Storage Errors ===
    /// File not found at the specified path.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`IssueError`] for adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client sent something malformed.
    Validation,
    /// Request conflicts with the current state of the aggregate.
    Conflict,
    /// Target aggregate does not exist.
    NotFound,
    /// Programming error; never retried.
    Programming,
    /// Persistence or I/O failure.
    Internal,
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl IssueError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_specification(reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    /// Classify this error for adapter response mapping.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidId { .. } | Self::Validation { .. } | Self::ValidationErrors { .. } => {
                ErrorKind::Validation
            }
            Self::StateConflict { .. }
            | Self::ConcurrencyConflict { .. }
            | Self::IdCollision { .. } => ErrorKind::Conflict,
            Self::IssueNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidSpecification { .. } => ErrorKind::Programming,
            Self::Cancelled
            | Self::JsonlParse { .. }
            | Self::FileNotFound(_)
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// True when the caller, not the system, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::NotFound
        )
    }
}

/// Result type using `IssueError`.
pub type Result<T> = std::result::Result<T, IssueError>;
