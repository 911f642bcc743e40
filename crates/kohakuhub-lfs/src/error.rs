use thiserror::Error;

#[derive(Debug, Error)]
pub enum LfsError {
    #[error("invalid oid: {0}")]
    InvalidOid(String),

    #[error("unsupported transfer adapter")]
    UnsupportedTransfer,

    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: i64, actual: i64 },

    #[error("object not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    BlobStore(#[from] kohakuhub_blobstore::BlobStoreError),
}

pub type Result<T> = std::result::Result<T, LfsError>;
