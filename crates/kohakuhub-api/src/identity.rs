//! Identity resolution: a request authenticates via a session cookie, a
//! bearer token, or (for `git`) HTTP Basic with the token in the
//! password slot. All three resolve to the same [`UserRow`]; a request
//! presenting none of them is simply anonymous, which is still valid
//! for public repositories.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;

use kohakuhub_auth::{effective_permission, RepoPermission};
use kohakuhub_db::{RepositoryRow, UserRow};

use crate::error::ApiError;
use crate::state::AppState;

/// The resolved caller, if any.
#[derive(Debug, Clone)]
pub struct Identity(pub Option<UserRow>);

impl Identity {
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.username.as_str())
    }

    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }

    /// The authenticated user, or `Unauthorized` if the caller is anonymous.
    pub fn require(self) -> Result<UserRow, ApiError> {
        self.0.ok_or(ApiError::Unauthorized)
    }
}

const SESSION_COOKIE_NAME: &str = "kohaku_session";

fn session_cookie(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|kv| {
        let (k, v) = kv.trim().split_once('=')?;
        (k == SESSION_COOKIE_NAME).then(|| v.to_string())
    })
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ").map(str::to_string)
}

/// `git` sends credentials as HTTP Basic; the password slot carries the
/// access token minted by the `git-credential-kohakuhub` helper.
fn basic_token(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = raw.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (_, password) = text.split_once(':')?;
    (!password.is_empty()).then(|| password.to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        if let Some(session_id) = session_cookie(parts) {
            if let Some(session) = state.db.get_valid_session(&session_id, Utc::now()).await? {
                if let Some(user) = state.db.get_user_by_id(session.user_id).await? {
                    return Ok(Identity(Some(user)));
                }
            }
        }

        if let Some(token) = bearer_token(parts).or_else(|| basic_token(parts)) {
            let hash = kohakuhub_auth::hash_token(&token);
            if let Some(token_row) = state.db.get_token_by_hash(&hash).await? {
                state.db.touch_token(token_row.id, Utc::now()).await?;
                if let Some(user) = state.db.get_user_by_id(token_row.user_id).await? {
                    return Ok(Identity(Some(user)));
                }
            }
        }

        Ok(Identity(None))
    }
}

/// Resolves the caller's effective permission on `repo`, consulting the
/// database for organization membership (the authoritative source; see
/// `Db::role_in_namespace`) rather than the in-memory `AuthStore`, which
/// exists only as a test double.
pub async fn repo_permission(
    state: &AppState,
    identity: &Identity,
    repo: &RepositoryRow,
) -> Result<RepoPermission, ApiError> {
    let namespace_role = match identity.user_id() {
        Some(uid) => state.db.role_in_namespace(uid, &repo.namespace).await?,
        None => None,
    };
    Ok(effective_permission(identity.username(), &repo.namespace, namespace_role, repo.private))
}

/// Requires at least `required` permission on `repo`, mapping a shortfall
/// to the HF-style `GatedRepo` error (or `Unauthorized` for an anonymous
/// caller on a private repo, since the fix there is to authenticate).
pub async fn require_permission(
    state: &AppState,
    identity: &Identity,
    repo: &RepositoryRow,
    required: RepoPermission,
) -> Result<(), ApiError> {
    let granted = repo_permission(state, identity, repo).await?;
    if granted.has(required) {
        return Ok(());
    }
    if identity.user_id().is_none() && repo.private {
        return Err(ApiError::Unauthorized);
    }
    Err(ApiError::GatedRepo(format!("{required} access required")))
}
