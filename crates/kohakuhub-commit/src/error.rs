//! The commit engine's error type, one variant per distinct failure mode
//! the spec's error envelope (§6) needs to tell apart at the HTTP layer.

use kohakuhub_blobstore::BlobStoreError;
use kohakuhub_db::DbError;
use kohakuhub_lfs::LfsError;
use kohakuhub_vstore::VstoreError;
use thiserror::Error;

/// Errors raised while parsing or applying a commit, or while resolving
/// a path/revision for download.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The NDJSON body or an operation within it was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The repository, branch/tag/commit, or namespace does not exist.
    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    /// A path did not exist at the requested revision.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Committing would exceed the repository's or namespace's quota.
    #[error("quota exceeded: would use {used} of {quota} bytes")]
    QuotaExceeded {
        /// Projected usage had the commit been allowed to land.
        used: i64,
        /// The quota that usage would have exceeded.
        quota: i64,
    },

    /// Another commit landed on the same branch first (spec §5
    /// "linearizable"); the caller should retry against the new tip.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A backing store failed in a way that isn't the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for [`CommitError`].
pub type Result<T> = std::result::Result<T, CommitError>;

impl From<VstoreError> for CommitError {
    fn from(e: VstoreError) -> Self {
        match e {
            VstoreError::RepoNotFound(s) | VstoreError::RefNotFound(s) => {
                CommitError::RevisionNotFound(s)
            }
            VstoreError::PathNotFound(s) => CommitError::EntryNotFound(s),
            VstoreError::Conflict(s) => CommitError::Conflict(s),
            VstoreError::CommitNotFound(s) => CommitError::RevisionNotFound(s),
            VstoreError::RepoAlreadyExists(s) | VstoreError::RefAlreadyExists(s) => {
                CommitError::BadRequest(s)
            }
            VstoreError::Immutable(s) => CommitError::BadRequest(s),
            VstoreError::NotInline(s) => CommitError::Internal(s),
        }
    }
}

impl From<DbError> for CommitError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::QuotaExceeded { used, quota } => CommitError::QuotaExceeded { used, quota },
            DbError::NotFound(s) => CommitError::RevisionNotFound(s),
            DbError::AlreadyExists(s) => CommitError::BadRequest(s),
            DbError::InvalidOperation(s) => CommitError::BadRequest(s),
            DbError::Sqlx(e) => CommitError::Internal(e.to_string()),
            DbError::Migrate(e) => CommitError::Internal(e.to_string()),
        }
    }
}

impl From<BlobStoreError> for CommitError {
    fn from(e: BlobStoreError) -> Self {
        match e {
            BlobStoreError::NotFound(s) => CommitError::EntryNotFound(s),
            BlobStoreError::Backend(s) | BlobStoreError::Presign(s) => CommitError::Internal(s),
        }
    }
}

impl From<LfsError> for CommitError {
    fn from(e: LfsError) -> Self {
        match e {
            LfsError::NotFound(s) => CommitError::EntryNotFound(s),
            LfsError::InvalidOid(s) => CommitError::BadRequest(format!("invalid oid: {s}")),
            LfsError::UnsupportedTransfer => {
                CommitError::BadRequest("unsupported transfer adapter".into())
            }
            LfsError::SizeMismatch { expected, actual } => CommitError::BadRequest(format!(
                "size mismatch: expected {expected}, got {actual}"
            )),
            LfsError::BlobStore(e) => e.into(),
        }
    }
}
