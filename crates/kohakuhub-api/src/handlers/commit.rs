//! `POST /api/{type}s/{namespace}/{name}/preupload/{revision}` and
//! `POST /api/{type}s/{namespace}/{name}/commit/{revision}` (the NDJSON
//! commit protocol).

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

use kohakuhub_auth::RepoPermission;
use kohakuhub_commit::{decide_preupload, CommitContext, CommitEngine, EffectiveLfsConfig, PreuploadFile, UploadMode};
use kohakuhub_db::RepositoryRow;
use kohakuhub_types::RepoType;

use crate::error::{ApiError, Result};
use crate::identity::{require_permission, Identity};
use crate::state::AppState;
use crate::types::{CommitResponse, PreuploadFileResponse, PreuploadRequestBody, PreuploadResponseBody};

fn effective_lfs_config(state: &AppState, repo: &RepositoryRow) -> EffectiveLfsConfig {
    EffectiveLfsConfig::from_repo(repo, state.config.lfs_threshold_bytes)
}

async fn load_repo(state: &AppState, repo_type: &str, namespace: &str, name: &str) -> Result<RepositoryRow> {
    let repo_type = RepoType::from_path_segment(repo_type)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown repo type: {repo_type}")))?;
    state
        .db
        .get_repository(repo_type.db_key(), namespace, name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))
}

pub async fn preupload(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, _revision)): Path<(String, String, String, String)>,
    Json(req): Json<PreuploadRequestBody>,
) -> Result<Json<PreuploadResponseBody>> {
    let repo = load_repo(&state, &repo_type, &namespace, &name).await?;
    require_permission(&state, &identity, &repo, RepoPermission::Write).await?;

    let lfs_config = effective_lfs_config(&state, &repo);
    let files: Vec<PreuploadFile> = req
        .files
        .iter()
        .map(|f| PreuploadFile { path: f.path.clone(), size: f.size, sha256: f.sha256.clone() })
        .collect();
    let decisions = decide_preupload(&state.db, repo.id, &files, &lfs_config).await?;

    Ok(Json(PreuploadResponseBody {
        files: decisions
            .into_iter()
            .map(|d| PreuploadFileResponse {
                path: d.path,
                upload_mode: match d.upload_mode {
                    UploadMode::Regular => "regular".to_string(),
                    UploadMode::Lfs => "lfs".to_string(),
                },
                should_ignore: d.should_ignore,
            })
            .collect(),
    }))
}

/// The quota ceiling and current usage governing writes to `namespace`:
/// an organization's own allotment, or a user's personal one, falling
/// back to unlimited if neither account exists (shouldn't happen for a
/// namespace that already owns a repository, but costs nothing to be
/// defensive about a stale lookup).
async fn namespace_quota(state: &AppState, namespace: &str) -> Result<(Option<i64>, i64)> {
    if let Some(org) = state.db.get_organization_by_name(namespace).await? {
        return Ok((org.quota_bytes, org.used_bytes));
    }
    if let Some(user) = state.db.get_user_by_username(namespace).await? {
        return Ok((user.quota_bytes, user.used_bytes));
    }
    Ok((None, 0))
}

pub async fn commit(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, revision)): Path<(String, String, String, String)>,
    body: Bytes,
) -> Result<Json<CommitResponse>> {
    let user = identity.require()?;
    let repo = load_repo(&state, &repo_type, &namespace, &name).await?;
    require_permission(&state, &identity, &repo, RepoPermission::Write).await?;

    let lfs_config = effective_lfs_config(&state, &repo);
    let (namespace_quota_bytes, namespace_used_bytes) = namespace_quota(&state, &namespace).await?;
    let body_text = String::from_utf8(body.to_vec()).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let engine = CommitEngine::new(state.db.clone(), state.vstore.clone(), state.blobstore.clone());
    let outcome = engine
        .commit(CommitContext {
            repo: &repo,
            branch: &revision,
            actor_user_id: user.id,
            namespace_quota_bytes,
            namespace_used_bytes,
            lfs_config: &lfs_config,
            auto_gc: state.config.lfs_auto_gc,
            lfs_keep_versions: state.config.lfs_keep_versions,
            body: &body_text,
        })
        .await?;

    let repo_type = RepoType::from_db_key(&repo.repo_type).unwrap_or(RepoType::Model);
    Ok(Json(CommitResponse {
        commit_oid: outcome.commit_id.clone(),
        commit_url: format!(
            "{}/{}/{}/{}/commit/{}",
            state.config.base_url,
            repo_type.path_segment(),
            repo.namespace,
            repo.name,
            outcome.commit_id
        ),
    }))
}
