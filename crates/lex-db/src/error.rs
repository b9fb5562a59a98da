//! Database error types for lex-db.

use lex_core::errors::CoreError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub fn not_found(entity_type: &str, id: impl Into<String>) -> Self {
        Self::Core(CoreError::not_found(entity_type, id))
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Core(CoreError::Forbidden(reason.into()))
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Core(CoreError::Validation(reason.into()))
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Core(CoreError::Conflict(reason.into()))
    }

    /// Turn a libSQL unique-constraint failure into a `Conflict`, pass anything else through.
    #[must_use]
    pub fn on_unique(self, reason: &str) -> Self {
        match &self {
            Self::LibSql(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Self::conflict(reason)
            }
            _ => self,
        }
    }
}
