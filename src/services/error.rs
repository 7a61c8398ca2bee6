//! Error taxonomy shared by every service

use sea_orm::DbErr;
use thiserror::Error;

/// Errors surfaced by catalog, address book, directory and order workflow
/// operations. Nothing is retried; a failed mutation leaves the store as
/// it was.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Unknown order, user, address or product id
    #[error("{0} not found")]
    NotFound(String),

    /// Malformed input, empty item list, missing revision reason
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status move the workflow does not allow
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// The acting user's role does not allow the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Another writer changed the record first
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ServiceError {
    pub fn not_found(kind: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{} {}", kind, id))
    }

    /// Stable code for programmatic handling by clients
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::InvalidTransition(_) => "INVALID_TRANSITION",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Database(_) => "DATABASE_ERROR",
        }
    }
}
