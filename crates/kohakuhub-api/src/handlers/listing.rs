//! `GET /api/{type}s/{namespace}/{name}/tree/{rev}/{path}` and
//! `POST /api/{type}s/{namespace}/{name}/paths-info/{rev}` (spec §4.6).

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use kohakuhub_auth::RepoPermission;
use kohakuhub_commit::{list_tree, paths_info, repo_key};
use kohakuhub_types::RepoType;

use crate::error::{ApiError, Result};
use crate::identity::{require_permission, Identity};
use crate::state::AppState;
use crate::types::{CommitSummary, CommitsPage, PathsInfoRequest, TreeEntryResponse, TreePage};

const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_COMMITS_PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

async fn load_repo(
    state: &AppState,
    identity: &Identity,
    repo_type: &str,
    namespace: &str,
    name: &str,
) -> Result<kohakuhub_db::RepositoryRow> {
    let repo_type = RepoType::from_path_segment(repo_type)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown repo type: {repo_type}")))?;
    let repo = state
        .db
        .get_repository(repo_type.db_key(), namespace, name)
        .await?
        .ok_or_else(|| ApiError::RepoNotFound(format!("{namespace}/{name}")))?;
    require_permission(state, identity, &repo, RepoPermission::Read).await?;
    Ok(repo)
}

pub async fn tree(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, revision, path)): Path<(String, String, String, String, String)>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreePage>> {
    let repo = load_repo(&state, &identity, &repo_type, &namespace, &name).await?;
    let key = repo_key(&repo);

    let (entries, next_cursor) = list_tree(
        state.vstore.as_ref(),
        &key,
        &revision,
        path.trim_matches('/'),
        query.recursive,
        query.cursor.as_deref(),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .await?;

    Ok(Json(TreePage { entries: entries.into_iter().map(TreeEntryResponse::from).collect(), next_cursor }))
}

pub async fn tree_root(
    state: State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, revision)): Path<(String, String, String, String)>,
    query: Query<TreeQuery>,
) -> Result<Json<TreePage>> {
    tree(state, identity, Path((repo_type, namespace, name, revision, String::new())), query).await
}

pub async fn paths_info_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, revision)): Path<(String, String, String, String)>,
    Json(req): Json<PathsInfoRequest>,
) -> Result<Json<Vec<TreeEntryResponse>>> {
    let repo = load_repo(&state, &identity, &repo_type, &namespace, &name).await?;
    let key = repo_key(&repo);

    let entries = paths_info(state.vstore.as_ref(), &key, &revision, &req.paths).await?;
    Ok(Json(entries.into_iter().map(TreeEntryResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CommitsQuery {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// `GET /{type}s/{namespace}/{name}/commits/{branch}` (spec §6): commit
/// history from `kohakuhub-db`, not the versioned store, since it
/// carries the author username the store's own `CommitMeta` doesn't.
pub async fn commits(
    State(state): State<AppState>,
    identity: Identity,
    Path((repo_type, namespace, name, branch)): Path<(String, String, String, String)>,
    Query(query): Query<CommitsQuery>,
) -> Result<Json<CommitsPage>> {
    let repo = load_repo(&state, &identity, &repo_type, &namespace, &name).await?;
    let limit = query.limit.unwrap_or(DEFAULT_COMMITS_PAGE_SIZE).max(1);
    let before: Option<DateTime<Utc>> = query
        .after
        .as_deref()
        .map(|s| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("invalid cursor: {e}")))?;

    let mut rows = state.db.list_commits(repo.id, &branch, limit + 1, before).await?;
    let has_more = rows.len() as i64 > limit;
    rows.truncate(limit as usize);
    let next_cursor = has_more.then(|| rows.last().map(|r| r.created_at.to_rfc3339())).flatten();

    let authors: HashMap<String, String> = state.db.list_commit_authors(repo.id).await?.into_iter().collect();
    let commits = rows
        .into_iter()
        .map(|r| CommitSummary {
            author: authors.get(&r.commit_id).cloned().unwrap_or_else(|| "unknown".to_string()),
            id: r.commit_id,
            message: r.message,
            description: r.description,
            date: r.created_at,
        })
        .collect();

    Ok(Json(CommitsPage { commits, has_more, next_cursor }))
}
