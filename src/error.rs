//! Error types for the forest engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForestError>;

#[derive(Error, Debug)]
pub enum ForestError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Node '{0}' already exists")]
    Conflict(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl ForestError {
    /// Get error code for wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            ForestError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ForestError::NotFound(_) => "NOT_FOUND",
            ForestError::Conflict(_) => "CONFLICT",
            ForestError::InvalidOperation(_) => "INVALID_OPERATION",
            ForestError::Storage(_) | ForestError::Io(_) | ForestError::Json(_) => "STORAGE_ERROR",
            ForestError::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    /// Errors raised by the persistence collaborator rather than by the
    /// caller's arguments. Only these are worth retrying.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            ForestError::Storage(_) | ForestError::Io(_) | ForestError::Json(_)
        )
    }
}

/// Reject empty and whitespace-only identifiers.
pub(crate) fn require_name(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ForestError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}
