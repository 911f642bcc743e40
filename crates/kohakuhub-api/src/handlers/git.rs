//! Git Smart HTTP v1 (spec §4.3): `GET .git/info/refs`, `POST
//! .git/git-upload-pack`, `GET .git/HEAD`, `POST .git/git-receive-pack`.
//!
//! Objects are never stored; each request synthesizes them afresh from
//! the versioned store's current snapshot via [`kohakuhub_commit::sync_repo`].
//! Routes capture the repository segment as `{name}.git` in one path
//! piece (axum's router has no notion of a literal suffix on a dynamic
//! segment) and strip `.git` here.

use std::collections::HashMap;
use std::io::Cursor;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use kohakuhub_auth::RepoPermission;
use kohakuhub_db::RepositoryRow;

use crate::error::{ApiError, Result};
use crate::identity::{require_permission, Identity};
use crate::state::AppState;

/// Strips the `.git` suffix axum captured as part of the path segment.
fn repo_name(name_git: &str) -> Result<&str> {
    name_git
        .strip_suffix(".git")
        .ok_or_else(|| ApiError::BadRequest(format!("expected a .git path segment, got {name_git}")))
}

async fn load_repo(state: &AppState, namespace: &str, name_git: &str) -> Result<RepositoryRow> {
    let name = repo_name(name_git)?;
    state
        .db
        .get_repository_by_namespace_name(namespace, name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))
}

/// Maps an [`ApiError`] to a response, adding `WWW-Authenticate: Basic`
/// on 401 per spec §4.3's failure model (the generic envelope in
/// `error.rs` doesn't know this route speaks Basic auth).
fn git_error_response(err: ApiError) -> Response {
    let mut response = err.into_response();
    if response.status() == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
    }
    response
}

async fn commit_authors(state: &AppState, repo: &RepositoryRow) -> Result<HashMap<String, String>> {
    Ok(state.db.list_commit_authors(repo.id).await?.into_iter().collect())
}

#[derive(Debug, Deserialize)]
pub struct InfoRefsQuery {
    service: Option<String>,
}

async fn info_refs_inner(
    state: &AppState,
    identity: &Identity,
    namespace: &str,
    name_git: &str,
    service: Option<&str>,
) -> Result<Response> {
    if let Some(service) = service {
        if service != "git-upload-pack" {
            return Err(ApiError::BadRequest(format!("unsupported service: {service}")));
        }
    }

    let repo = load_repo(state, namespace, name_git).await?;
    require_permission(state, identity, &repo, RepoPermission::Read).await?;

    let repo_key = kohakuhub_commit::repo_key(&repo);
    let authors = commit_authors(state, &repo).await?;
    let (_store, head, refs) = kohakuhub_commit::sync_repo(state.vstore.as_ref(), &repo_key, &authors).await?;

    let mut body = Vec::new();
    kohakuhub_git::advertise_refs(&mut body, head, &refs, "git-upload-pack")?;

    let mut response = body.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-git-upload-pack-advertisement"),
    );
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

pub async fn info_refs(
    State(state): State<AppState>,
    identity: Identity,
    Path((namespace, name_git)): Path<(String, String)>,
    Query(query): Query<InfoRefsQuery>,
) -> Response {
    match info_refs_inner(&state, &identity, &namespace, &name_git, query.service.as_deref()).await {
        Ok(response) => response,
        Err(e) => git_error_response(e),
    }
}

async fn upload_pack_inner(
    state: &AppState,
    identity: &Identity,
    namespace: &str,
    name_git: &str,
) -> Result<(RepositoryRow, kohakuhub_storage::ObjectStore)> {
    let repo = load_repo(state, namespace, name_git).await?;
    require_permission(state, identity, &repo, RepoPermission::Read).await?;

    let repo_key = kohakuhub_commit::repo_key(&repo);
    let authors = commit_authors(state, &repo).await?;
    let (store, _head, _refs) = kohakuhub_commit::sync_repo(state.vstore.as_ref(), &repo_key, &authors).await?;
    Ok((repo, store))
}

pub async fn upload_pack(
    State(state): State<AppState>,
    identity: Identity,
    Path((namespace, name_git)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let store = match upload_pack_inner(&state, &identity, &namespace, &name_git).await {
        Ok((_repo, store)) => store,
        Err(e) => return git_error_response(e),
    };

    let mut reader = Cursor::new(body);
    let mut out = Vec::new();
    // Faults during pack emission are surfaced in-band on side-band
    // channel 3 by `kohakuhub_git::upload_pack` itself before it returns
    // `Err`; `out` already holds that frame, so the response is the same
    // either way (spec §4.3 "Failure model").
    let _ = kohakuhub_git::upload_pack(&mut reader, &mut out, &store);

    let mut response = out.into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/x-git-upload-pack-result"));
    response
}

pub async fn head(
    State(state): State<AppState>,
    identity: Identity,
    Path((namespace, name_git)): Path<(String, String)>,
) -> Response {
    // The repository's actual default branch isn't modeled for this
    // route (spec §4.3: "literal `ref: refs/heads/main\n`"); it's a
    // fixed symbolic-ref response, same as every other repo's HEAD.
    let result: Result<()> = async {
        let repo = load_repo(&state, &namespace, &name_git).await?;
        require_permission(&state, &identity, &repo, RepoPermission::Read).await
    }
    .await;

    if let Err(e) = result {
        return git_error_response(e);
    }

    let mut response = "ref: refs/heads/main\n".into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

pub async fn receive_pack(
    State(state): State<AppState>,
    identity: Identity,
    Path((namespace, name_git)): Path<(String, String)>,
    _body: Bytes,
) -> Response {
    let result: Result<()> = async {
        let repo = load_repo(&state, &namespace, &name_git).await?;
        require_permission(&state, &identity, &repo, RepoPermission::Write).await
    }
    .await;

    if let Err(e) = result {
        return git_error_response(e);
    }

    git_error_response(ApiError::BadRequest(kohakuhub_git::receive_pack_not_supported().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kohakuhub_blobstore::MemoryBlobStore;
    use kohakuhub_vstore::MemoryVersionedStore;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let db = kohakuhub_db::Db::from_pool(sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap());
        AppState::new(
            db,
            Arc::new(MemoryVersionedStore::new()),
            Arc::new(MemoryBlobStore::new()),
            crate::state::HubConfig::default(),
        )
    }

    #[test]
    fn repo_name_strips_dot_git_suffix() {
        assert_eq!(repo_name("myrepo.git").unwrap(), "myrepo");
        assert!(repo_name("myrepo").is_err());
    }

    #[test]
    fn git_error_response_adds_basic_challenge_only_on_401() {
        let unauthorized = git_error_response(ApiError::Unauthorized);
        assert_eq!(unauthorized.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Basic");

        let not_found = git_error_response(ApiError::RepoNotFound("x/y".to_string()));
        assert!(not_found.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[tokio::test]
    async fn info_refs_rejects_unsupported_service_before_touching_the_db() {
        let state = test_state();
        let identity = Identity(None);
        let result =
            info_refs_inner(&state, &identity, "alice", "demo.git", Some("git-receive-pack")).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
