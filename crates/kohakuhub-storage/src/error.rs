//! Storage error types.

use thiserror::Error;

/// Errors that can occur while handling git objects in memory.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object's content did not parse as the claimed type.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// A zlib (de)compression pass failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// The requested object id is not present in the scratch store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
}

/// A specialized `Result` type for [`StorageError`].
pub type Result<T> = std::result::Result<T, StorageError>;
