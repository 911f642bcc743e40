//! `POST /api/repos/create`, `DELETE /api/repos/delete`,
//! `GET /api/{type}s/{namespace}/{name}`, `PUT .../settings`.

use axum::extract::{Path, State};
use axum::Json;

use kohakuhub_auth::RepoPermission;
use kohakuhub_types::{NamespaceRole, RepoType};

use crate::error::{ApiError, Result};
use crate::identity::{require_permission, Identity};
use crate::state::AppState;
use crate::types::{CreateRepoRequest, CreateRepoResponse, DeleteRepoRequest, RepoInfoResponse, UpdateRepoSettingsRequest};
use crate::validation::validate_name;

fn parse_repo_type(s: &str) -> Result<RepoType> {
    RepoType::from_path_segment(s).ok_or_else(|| ApiError::BadRequest(format!("unknown repo type: {s}")))
}

/// A namespace accepts a new repository from `actor` when they own it
/// outright or hold at least `Member` within the owning organization.
async fn can_create_in_namespace(state: &AppState, user_id: i64, username: &str, namespace: &str) -> Result<bool> {
    if namespace.eq_ignore_ascii_case(username) {
        return Ok(true);
    }
    let role = state.db.role_in_namespace(user_id, namespace).await?;
    Ok(role.is_some_and(|r| r.has(NamespaceRole::Member)))
}

pub async fn create_repo(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateRepoRequest>,
) -> Result<Json<CreateRepoResponse>> {
    let user = identity.require()?;
    let repo_type = parse_repo_type(&req.repo_type)?;
    let namespace = req.organization.unwrap_or_else(|| user.username.clone());
    validate_name(&req.name).map_err(ApiError::BadRequest)?;

    if !can_create_in_namespace(&state, user.id, &user.username, &namespace).await? {
        return Err(ApiError::GatedRepo(format!("no write access to namespace {namespace}")));
    }

    let row = state.db.create_repository(repo_type.db_key(), &namespace, &req.name, req.private, user.id).await?;

    let repo_key = kohakuhub_commit::repo_key(&row);
    state.vstore.create_repo(&repo_key).await?;

    Ok(Json(CreateRepoResponse {
        url: format!("{}/{}/{}/{}", state.config.base_url, repo_type.path_segment(), row.namespace, row.name),
        repo_id: row.id.to_string(),
    }))
}

pub async fn delete_repo(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<DeleteRepoRequest>,
) -> Result<()> {
    let repo_type = parse_repo_type(&req.repo_type)?;
    let namespace = req.organization.unwrap_or_else(|| identity.username().unwrap_or_default().to_string());

    let row = state
        .db
        .get_repository(repo_type.db_key(), &namespace, &req.name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{}", req.name)))?;

    require_permission(&state, &identity, &row, RepoPermission::Delete).await?;

    let repo_key = kohakuhub_commit::repo_key(&row);
    state.vstore.delete_repo(&repo_key).await?;
    state.db.delete_repository(row.id).await?;
    Ok(())
}

pub async fn get_repo_info(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name)): Path<(String, String, String)>,
) -> Result<Json<RepoInfoResponse>> {
    let repo_type = parse_repo_type(&repo_type)?;
    let row = state
        .db
        .get_repository(repo_type.db_key(), &namespace, &name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))?;

    require_permission(&state, &identity, &row, RepoPermission::Read).await?;

    Ok(Json(RepoInfoResponse {
        id: row.id.to_string(),
        repo_type: repo_type.path_segment(),
        namespace: row.namespace,
        name: row.name,
        private: row.private,
        used_bytes: row.used_bytes,
        quota_bytes: row.quota_bytes,
    }))
}

pub async fn update_repo_settings(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name)): Path<(String, String, String)>,
    Json(req): Json<UpdateRepoSettingsRequest>,
) -> Result<Json<RepoInfoResponse>> {
    let repo_type = parse_repo_type(&repo_type)?;
    let row = state
        .db
        .get_repository(repo_type.db_key(), &namespace, &name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))?;

    require_permission(&state, &identity, &row, RepoPermission::Delete).await?;

    let updated = state
        .db
        .update_repository_settings(
            row.id,
            req.private,
            req.quota_bytes,
            req.lfs_threshold_bytes,
            req.lfs_keep_versions,
            None,
        )
        .await?;

    Ok(Json(RepoInfoResponse {
        id: updated.id.to_string(),
        repo_type: repo_type.path_segment(),
        namespace: updated.namespace,
        name: updated.name,
        private: updated.private,
        used_bytes: updated.used_bytes,
        quota_bytes: updated.quota_bytes,
    }))
}
