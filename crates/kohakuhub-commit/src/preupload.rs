//! Preupload (spec §4.2): tells a client, before it sends any bytes,
//! whether each file must go through the regular commit payload or the
//! LFS Batch API, and whether it should be skipped entirely.

use crate::engine::EffectiveLfsConfig;
use crate::error::Result;
use kohakuhub_db::Db;

/// One file a client is about to commit.
#[derive(Debug, Clone)]
pub struct PreuploadFile {
    pub path: String,
    pub size: i64,
    /// SHA-256 of the file's content, when the client already knows it
    /// (spec §4.2 wire contract `[{path,size,sha256}]`), used to detect
    /// content-dedup against the current live `File` row.
    pub sha256: Option<String>,
}

/// How a client should upload one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Send the bytes inline in the NDJSON commit body (`file` operation).
    Regular,
    /// Upload through the LFS Batch API first, then reference it with
    /// an `lfsFile` operation.
    Lfs,
}

/// The preupload decision for one file.
#[derive(Debug, Clone)]
pub struct PreuploadDecision {
    pub path: String,
    pub upload_mode: UploadMode,
    /// True if the hub will silently drop this path from the commit
    /// (VCS-internal paths the hub itself manages, e.g. `.git/*`).
    pub should_ignore: bool,
}

/// Paths the hub manages itself and never accepts client writes to
/// (spec §4.6 "`.gitattributes` synthesis": this file is generated by
/// the hub from the repository's LFS rules, not committed by clients).
fn is_hub_managed(path: &str) -> bool {
    path == ".gitattributes" || path.starts_with(".git/")
}

/// Computes the upload-mode/should-ignore decision for every file in a
/// preupload request. `should_ignore` is true for hub-managed paths, and
/// also for any path whose client-supplied `sha256` already matches the
/// repository's current live `File` row at that path (spec §4.2:
/// content-dedup lets the client skip sending bytes it knows the hub
/// already has).
pub async fn decide(
    db: &Db,
    repo_id: i64,
    files: &[PreuploadFile],
    lfs_config: &EffectiveLfsConfig,
) -> Result<Vec<PreuploadDecision>> {
    let mut decisions = Vec::with_capacity(files.len());
    for f in files {
        if is_hub_managed(&f.path) {
            decisions.push(PreuploadDecision {
                path: f.path.clone(),
                upload_mode: UploadMode::Regular,
                should_ignore: true,
            });
            continue;
        }

        let upload_mode = if lfs_config.requires_lfs(&f.path, f.size) {
            UploadMode::Lfs
        } else {
            UploadMode::Regular
        };

        let should_ignore = match &f.sha256 {
            Some(sha256) => db
                .get_live_file(repo_id, &f.path)
                .await?
                .is_some_and(|existing| existing.sha256 == *sha256),
            None => false,
        };

        decisions.push(PreuploadDecision { path: f.path.clone(), upload_mode, should_ignore });
    }
    Ok(decisions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EffectiveLfsConfig {
        EffectiveLfsConfig { threshold_bytes: 10_000_000, suffix_rules: vec![".bin".into()] }
    }

    fn db() -> Db {
        Db::from_pool(sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap())
    }

    fn file(path: &str, size: i64) -> PreuploadFile {
        PreuploadFile { path: path.into(), size, sha256: None }
    }

    #[tokio::test]
    async fn small_file_is_regular() {
        let decisions = decide(&db(), 1, &[file("readme.md", 100)], &cfg()).await.unwrap();
        assert_eq!(decisions[0].upload_mode, UploadMode::Regular);
        assert!(!decisions[0].should_ignore);
    }

    #[tokio::test]
    async fn large_file_is_lfs() {
        let decisions = decide(&db(), 1, &[file("model.pt", 20_000_000)], &cfg()).await.unwrap();
        assert_eq!(decisions[0].upload_mode, UploadMode::Lfs);
    }

    #[tokio::test]
    async fn suffix_rule_forces_lfs_regardless_of_size() {
        let decisions = decide(&db(), 1, &[file("weights.bin", 10)], &cfg()).await.unwrap();
        assert_eq!(decisions[0].upload_mode, UploadMode::Lfs);
    }

    #[tokio::test]
    async fn gitattributes_is_ignored() {
        let decisions = decide(&db(), 1, &[file(".gitattributes", 10)], &cfg()).await.unwrap();
        assert!(decisions[0].should_ignore);
    }
}
