//! Blob store error types.

use thiserror::Error;

/// Errors raised by a [`crate::BlobStore`] implementation.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// The requested key has no object.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The underlying S3-compatible service returned an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// Presigning failed (e.g. invalid expiry, credential error).
    #[error("presign error: {0}")]
    Presign(String),
}

/// Result type for blob store operations.
pub type Result<T> = std::result::Result<T, BlobStoreError>;
