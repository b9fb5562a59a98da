//! Cross-cutting error types for Lexora.
//!
//! Errors that express a domain rule (ownership, uniqueness, state machine)
//! live here so every crate can raise them. Infrastructure errors
//! (`DatabaseError`, `StorageError`, ...) are defined in their own crates and
//! converge into the HTTP error in `lex-server`.

use thiserror::Error;

/// Errors that can be raised by any Lexora crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (format, ranges, batch shape).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller is authenticated but does not own or may not touch the entity.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation collides with existing state (duplicate email, double join).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity_type: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.into(),
        }
    }
}
