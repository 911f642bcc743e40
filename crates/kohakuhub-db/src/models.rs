//! Row types mirroring the tables in `migrations/0001_init.sql` (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub quota_bytes: Option<i64>,
    pub used_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrganizationRow {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub created_by: i64,
    pub quota_bytes: Option<i64>,
    pub used_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrgMemberRow {
    pub organization_id: i64,
    pub user_id: i64,
    pub role: String,
    pub added_by: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RepositoryRow {
    pub id: i64,
    pub repo_type: String,
    pub namespace: String,
    pub name: String,
    pub normalized_namespace: String,
    pub normalized_name: String,
    pub private: bool,
    pub owner_id: i64,
    pub quota_bytes: Option<i64>,
    pub used_bytes: i64,
    pub lfs_threshold_bytes: Option<i64>,
    pub lfs_keep_versions: Option<i32>,
    pub lfs_suffix_rules: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FileRow {
    pub id: i64,
    pub repository_id: i64,
    pub path_in_repo: String,
    pub size: i64,
    pub sha256: String,
    pub lfs: bool,
    pub is_deleted: bool,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommitRow {
    pub id: i64,
    pub repository_id: i64,
    pub commit_id: String,
    pub branch: String,
    pub author_id: i64,
    pub committer_id: i64,
    pub message: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LfsObjectHistoryRow {
    pub id: i64,
    pub repository_id: i64,
    pub path_in_repo: String,
    pub sha256: String,
    pub size: i64,
    pub commit_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StagingUploadRow {
    pub id: i64,
    pub repository_id: i64,
    pub sha256: String,
    pub size: i64,
    pub storage_key: String,
    pub upload_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TokenRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}
