//! Git LFS Batch API and verify hook (spec §4.4):
//! `POST /{namespace}/{name}.git/info/lfs/objects/batch` and
//! `POST /api/{namespace}/{name}.git/info/lfs/verify`.

use axum::extract::{Path, State};
use axum::Json;

use kohakuhub_auth::RepoPermission;
use kohakuhub_db::RepositoryRow;
use kohakuhub_lfs::{handle_batch, verify_object, BatchOperation, BatchRequest, BatchResponse, VerifyRequest};

use crate::error::{ApiError, Result};
use crate::identity::{require_permission, Identity};
use crate::state::AppState;

async fn load_repo(state: &AppState, namespace: &str, name_git: &str) -> Result<RepositoryRow> {
    let name = name_git
        .strip_suffix(".git")
        .ok_or_else(|| ApiError::BadRequest(format!("expected a .git path segment, got {name_git}")))?;
    state
        .db
        .get_repository_by_namespace_name(namespace, name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))
}

pub async fn batch(
    State(state): State<AppState>,
    identity: Identity,
    Path((namespace, name_git)): Path<(String, String)>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>> {
    let repo = load_repo(&state, &namespace, &name_git).await?;
    let required = match req.operation {
        BatchOperation::Download => RepoPermission::Read,
        BatchOperation::Upload => RepoPermission::Write,
    };
    require_permission(&state, &identity, &repo, required).await?;

    let name = name_git.strip_suffix(".git").unwrap_or(&name_git);
    let verify_url = format!("{}/api/{namespace}/{name}.git/info/lfs/verify", state.config.base_url);
    let expires_in = state.config.presign_expiry;
    let blobstore = state.blobstore.clone();
    let operation = req.operation;

    let response = handle_batch(
        blobstore.as_ref(),
        req,
        move |oid| {
            let blobstore = blobstore.clone();
            let key = kohakuhub_types::ContentHash::from_hex(oid).map(|h| h.lfs_key()).unwrap_or_default();
            async move {
                let presigned = match operation {
                    BatchOperation::Download => blobstore.presign_get(&key, expires_in).await,
                    BatchOperation::Upload => blobstore.presign_put(&key, expires_in).await,
                };
                presigned.unwrap_or_default()
            }
        },
        Some(&verify_url),
        expires_in,
        state.config.lfs_chunk_size,
    )
    .await;

    if req_is_upload(operation) {
        stage_pending_uploads(&state, &repo, &response).await?;
    }

    Ok(Json(response))
}

fn req_is_upload(operation: BatchOperation) -> bool {
    matches!(operation, BatchOperation::Upload)
}

/// Records a staging row for every object the batch handed out a fresh
/// upload URL for, so [`verify`] has something to promote once the
/// client's `PUT` lands (spec §3 "Staging Upload" lifecycle).
async fn stage_pending_uploads(state: &AppState, repo: &RepositoryRow, response: &BatchResponse) -> Result<()> {
    for obj in &response.objects {
        let Some(actions) = &obj.actions else { continue };
        if actions.upload.is_none() {
            continue;
        }
        let key = kohakuhub_types::ContentHash::from_hex(&obj.oid).map(|h| h.lfs_key()).unwrap_or_default();
        state.db.create_staging_upload(repo.id, &obj.oid, obj.size, &key, None).await?;
    }
    Ok(())
}

pub async fn verify(
    State(state): State<AppState>,
    identity: Identity,
    Path((namespace, name_git)): Path<(String, String)>,
    Json(req): Json<VerifyRequest>,
) -> Result<()> {
    let repo = load_repo(&state, &namespace, &name_git).await?;
    require_permission(&state, &identity, &repo, RepoPermission::Write).await?;

    verify_object(state.blobstore.as_ref(), &req).await?;
    state.db.promote_staging_upload(repo.id, &req.oid).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_repo_rejects_a_segment_without_dot_git() {
        let state = {
            let db = kohakuhub_db::Db::from_pool(sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap());
            AppState::new(
                db,
                std::sync::Arc::new(kohakuhub_vstore::MemoryVersionedStore::new()),
                std::sync::Arc::new(kohakuhub_blobstore::MemoryBlobStore::new()),
                crate::state::HubConfig::default(),
            )
        };
        let result = load_repo(&state, "alice", "demo").await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn req_is_upload_matches_only_the_upload_operation() {
        assert!(req_is_upload(BatchOperation::Upload));
        assert!(!req_is_upload(BatchOperation::Download));
    }
}
