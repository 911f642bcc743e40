use thiserror::Error;

#[derive(Debug, Error)]
pub enum VstoreError {
    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("repository already exists: {0}")]
    RepoAlreadyExists(String),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("ref already exists: {0}")]
    RefAlreadyExists(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("commit not found: {0}")]
    CommitNotFound(String),

    #[error("{0} is immutable")]
    Immutable(String),

    #[error("concurrent commit on {0}, rebase and retry")]
    Conflict(String),

    #[error("object at {0} is not stored inline; fetch it via its physical address")]
    NotInline(String),
}

pub type Result<T> = std::result::Result<T, VstoreError>;
