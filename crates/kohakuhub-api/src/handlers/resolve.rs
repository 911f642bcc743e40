//! `GET`/`HEAD /{type}s/{namespace}/{name}/resolve/{revision}/{path}`.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use kohakuhub_auth::RepoPermission;
use kohakuhub_commit::{resolve as resolve_path, DownloadAction};
use kohakuhub_types::RepoType;

use crate::error::{ApiError, Result};
use crate::identity::{require_permission, Identity};
use crate::state::AppState;

async fn resolve_inner(
    state: &AppState,
    identity: &Identity,
    repo_type: &str,
    namespace: &str,
    name: &str,
    revision: &str,
    path: &str,
    want_body: bool,
) -> Result<Response> {
    let repo_type = RepoType::from_path_segment(repo_type)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown repo type: {repo_type}")))?;
    let repo = state
        .db
        .get_repository(repo_type.db_key(), namespace, name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))?;
    require_permission(state, identity, &repo, RepoPermission::Read).await?;

    let repo_key = kohakuhub_commit::repo_key(&repo);
    let info = resolve_path(
        state.vstore.as_ref(),
        state.blobstore.as_ref(),
        &repo_key,
        revision,
        path,
        want_body,
        state.config.presign_expiry,
    )
    .await?;

    let mut response = match info.action {
        DownloadAction::Inline(bytes) => {
            let mut response = if want_body { bytes.into_response() } else { StatusCode::OK.into_response() };
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from_str(&info.size.to_string()).unwrap());
            response
        }
        DownloadAction::Redirect { url, linked_etag, linked_size } => {
            let mut response = Redirect::temporary(&url).into_response();
            if let Ok(v) = HeaderValue::from_str(&linked_etag) {
                response.headers_mut().insert("x-linked-etag", v);
            }
            response
                .headers_mut()
                .insert("x-linked-size", HeaderValue::from_str(&linked_size.to_string()).unwrap());
            response
        }
    };

    response.headers_mut().insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Ok(v) = HeaderValue::from_str(&info.etag) {
        response.headers_mut().insert("etag", v);
    }
    if let Ok(v) = HeaderValue::from_str(&info.repo_commit) {
        response.headers_mut().insert("x-repo-commit", v);
    }
    Ok(response)
}

pub async fn download(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, revision, path)): Path<(String, String, String, String, String)>,
) -> Result<Response> {
    resolve_inner(&state, &identity, &repo_type, &namespace, &name, &revision, &path, true).await
}

pub async fn download_head(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, revision, path)): Path<(String, String, String, String, String)>,
) -> Result<Response> {
    resolve_inner(&state, &identity, &repo_type, &namespace, &name, &revision, &path, false).await
}
