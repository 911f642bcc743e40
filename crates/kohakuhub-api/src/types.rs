//! Wire DTOs for the REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kohakuhub_commit::{EntryType, TreeEntry};

#[derive(Debug, Deserialize)]
pub struct CreateRepoRequest {
    #[serde(rename = "type")]
    pub repo_type: String,
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateRepoResponse {
    pub url: String,
    pub repo_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRepoRequest {
    #[serde(rename = "type")]
    pub repo_type: String,
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRepoSettingsRequest {
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub quota_bytes: Option<Option<i64>>,
    #[serde(default)]
    pub lfs_threshold_bytes: Option<Option<i64>>,
    #[serde(default)]
    pub lfs_keep_versions: Option<Option<i32>>,
}

#[derive(Debug, Deserialize)]
pub struct PreuploadRequestBody {
    pub files: Vec<PreuploadFileBody>,
}

#[derive(Debug, Deserialize)]
pub struct PreuploadFileBody {
    pub path: String,
    pub size: i64,
    #[serde(default)]
    pub sha256: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreuploadResponseBody {
    pub files: Vec<PreuploadFileResponse>,
}

#[derive(Debug, Serialize)]
pub struct PreuploadFileResponse {
    pub path: String,
    pub upload_mode: String,
    pub should_ignore: bool,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    #[serde(rename = "commitOid")]
    pub commit_oid: String,
    #[serde(rename = "commitUrl")]
    pub commit_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PathsInfoRequest {
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeEntryResponse {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lfs: Option<LfsInfoResponse>,
}

#[derive(Debug, Serialize)]
pub struct LfsInfoResponse {
    pub oid: String,
    pub size: u64,
}

impl From<TreeEntry> for TreeEntryResponse {
    fn from(entry: TreeEntry) -> Self {
        Self {
            path: entry.path,
            entry_type: match entry.entry_type {
                EntryType::File => "file",
                EntryType::Directory => "directory",
            },
            size: entry.size,
            oid: entry.oid,
            lfs: entry.lfs.map(|l| LfsInfoResponse { oid: l.oid, size: l.size }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TreePage {
    pub entries: Vec<TreeEntryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitsPage {
    pub commits: Vec<CommitSummary>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitSummary {
    pub id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub author: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RepoInfoResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub repo_type: &'static str,
    pub namespace: String,
    pub name: String,
    pub private: bool,
    pub used_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<i64>,
}
