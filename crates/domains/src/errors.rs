//! # DomainError
//!
//! Centralized error handling for the forum core.
//! Every port and service returns [`DomainResult`]; the HTTP layer turns the
//! error into a single human-readable message.

use std::fmt::Display;

use thiserror::Error;

/// The primary error type for all forum operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (field length, missing field).
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation requires a signed-in actor.
    #[error("you must be signed in to do this")]
    Unauthenticated,

    /// The actor lacks the role or ownership needed.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Referenced hunt, enigma, thread, post, profile or report is absent.
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// New posts are refused on a locked thread.
    #[error("this thread is locked")]
    ThreadLocked,

    /// The author's edit window has closed.
    #[error("this post can no longer be edited ({minutes} minute edit window exceeded)")]
    EditWindowExpired { minutes: i64 },

    /// The operation would break a structural invariant (e.g. removing a
    /// thread's opening post).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Unique key already taken (slug, username, e-mail).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The repository or identity service call itself failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Coarse taxonomy used by the outer layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Permission,
    NotFound,
    StateConflict,
    Backend,
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn backend(err: impl Display) -> Self {
        DomainError::Backend(err.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        DomainError::Permission(msg.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DomainError::Validation(_) => ErrorClass::Validation,
            DomainError::Unauthenticated | DomainError::Permission(_) => ErrorClass::Permission,
            DomainError::NotFound { .. } => ErrorClass::NotFound,
            DomainError::ThreadLocked
            | DomainError::EditWindowExpired { .. }
            | DomainError::InvariantViolation(_)
            | DomainError::Conflict(_) => ErrorClass::StateConflict,
            DomainError::Backend(_) => ErrorClass::Backend,
        }
    }
}

/// A specialized Result type for forum logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
