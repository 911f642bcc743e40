//! The HTTP error envelope: every failed request carries no JSON body,
//! only `x-error-code`/`x-error-message` headers, so that handlers whose
//! success response isn't JSON (redirects, raw blobs, git pack data)
//! have a uniform way to fail too.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use kohakuhub_auth::AuthError;
use kohakuhub_blobstore::BlobStoreError;
use kohakuhub_commit::CommitError;
use kohakuhub_db::DbError;
use kohakuhub_git::GitError;
use kohakuhub_lfs::LfsError;
use kohakuhub_vstore::VstoreError;

/// Request-handling errors, each carrying enough context to render the
/// error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("repository not found: {0}")]
    RepoNotFound(String),
    #[error("repository already exists: {0}")]
    RepoExists(String),
    #[error("revision not found: {0}")]
    RevisionNotFound(String),
    #[error("entry not found: {0}")]
    EntryNotFound(String),
    #[error("access denied: {0}")]
    GatedRepo(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("quota exceeded: would use {used} of {quota} bytes")]
    QuotaExceeded { used: i64, quota: i64 },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    ServerError(String),
}

/// Result alias used throughout the handler modules.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::RepoNotFound(_) => "RepoNotFound",
            ApiError::RepoExists(_) => "RepoExists",
            ApiError::RevisionNotFound(_) => "RevisionNotFound",
            ApiError::EntryNotFound(_) => "EntryNotFound",
            ApiError::GatedRepo(_) => "GatedRepo",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::QuotaExceeded { .. } => "QuotaExceeded",
            ApiError::Conflict(_) => "Conflict",
            ApiError::ServerError(_) => "ServerError",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::RepoNotFound(_) | ApiError::RevisionNotFound(_) | ApiError::EntryNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::RepoExists(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::GatedRepo(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::QuotaExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string().replace(['\r', '\n'], " ");

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code, %message, "request failed");
        } else {
            tracing::debug!(code, %message, "request failed");
        }

        let mut response = status.into_response();
        response.headers_mut().insert("x-error-code", HeaderValue::from_static(code));
        if let Ok(value) = HeaderValue::from_str(&message) {
            response.headers_mut().insert("x-error-message", value);
        }
        response
    }
}

impl From<CommitError> for ApiError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::BadRequest(s) => ApiError::BadRequest(s),
            CommitError::RevisionNotFound(s) => ApiError::RevisionNotFound(s),
            CommitError::EntryNotFound(s) => ApiError::EntryNotFound(s),
            CommitError::QuotaExceeded { used, quota } => ApiError::QuotaExceeded { used, quota },
            CommitError::Conflict(s) => ApiError::Conflict(s),
            CommitError::Internal(s) => ApiError::ServerError(s),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(s) => ApiError::RepoNotFound(s),
            DbError::AlreadyExists(s) => ApiError::RepoExists(s),
            DbError::QuotaExceeded { used, quota } => ApiError::QuotaExceeded { used, quota },
            DbError::InvalidOperation(s) => ApiError::BadRequest(s),
            DbError::Sqlx(e) => ApiError::ServerError(e.to_string()),
            DbError::Migrate(e) => ApiError::ServerError(e.to_string()),
        }
    }
}

impl From<VstoreError> for ApiError {
    fn from(e: VstoreError) -> Self {
        CommitError::from(e).into()
    }
}

impl From<BlobStoreError> for ApiError {
    fn from(e: BlobStoreError) -> Self {
        CommitError::from(e).into()
    }
}

impl From<LfsError> for ApiError {
    fn from(e: LfsError) -> Self {
        CommitError::from(e).into()
    }
}

impl From<GitError> for ApiError {
    fn from(e: GitError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NotFound(s) => ApiError::RepoNotFound(s),
            AuthError::PermissionDenied(s) => ApiError::GatedRepo(s),
            AuthError::AlreadyExists(s) => ApiError::RepoExists(s),
            AuthError::InvalidInput(s) => ApiError::BadRequest(s),
            AuthError::LastAdmin => ApiError::BadRequest("cannot remove the last organization admin".to_string()),
            AuthError::Unauthenticated => ApiError::Unauthorized,
        }
    }
}
