//! Error types for the auth crate.

use thiserror::Error;

/// Errors that can occur in identity resolution and permission checks.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The user lacks permission for the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The resource already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Cannot remove the last admin of an organization.
    #[error("cannot remove last admin of organization")]
    LastAdmin,

    /// No identity could be resolved and the operation requires one.
    #[error("authentication required")]
    Unauthenticated,
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
