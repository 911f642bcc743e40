//! The shared error type used where no more specific crate error applies.

use thiserror::Error;

/// Errors raised while parsing or constructing a shared identifier type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// A string did not parse as a 40-character hex git object id.
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    /// A string did not parse as a 64-character hex content hash.
    #[error("invalid content hash: {0}")]
    InvalidContentHash(String),
}

/// Result alias for [`TypesError`].
pub type Result<T> = std::result::Result<T, TypesError>;
