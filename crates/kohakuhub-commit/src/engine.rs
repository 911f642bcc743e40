//! The commit engine (spec §4.1): applies a parsed NDJSON commit request
//! against the versioned store and the metadata database as a single
//! logical unit.

use crate::error::{CommitError, Result};
use crate::ndjson::{parse_ndjson_operations, Operation};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use kohakuhub_blobstore::BlobStore;
use kohakuhub_db::{CommitFileWrite, Db, RepositoryRow};
use kohakuhub_types::ContentHash;
use kohakuhub_vstore::{PhysicalAddress, VersionedStore};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// The effective LFS routing rule for one repository (spec §4.2): a
/// file above `threshold_bytes`, or whose path ends with one of
/// `suffix_rules`, must be uploaded as `lfsFile` rather than `file`.
#[derive(Debug, Clone)]
pub struct EffectiveLfsConfig {
    pub threshold_bytes: i64,
    pub suffix_rules: Vec<String>,
}

impl EffectiveLfsConfig {
    /// Resolves a repository's effective config, falling back to the
    /// hub-wide defaults where the repository has none of its own set.
    #[must_use]
    pub fn from_repo(repo: &RepositoryRow, default_threshold_bytes: i64) -> Self {
        let threshold_bytes = repo.lfs_threshold_bytes.unwrap_or(default_threshold_bytes);
        let suffix_rules = repo
            .lfs_suffix_rules
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self { threshold_bytes, suffix_rules }
    }

    /// Whether a file with this path and size must go through LFS.
    #[must_use]
    pub fn requires_lfs(&self, path: &str, size: i64) -> bool {
        size >= self.threshold_bytes || self.suffix_rules.iter().any(|suf| path.ends_with(suf.as_str()))
    }
}

/// Everything the engine needs to apply one commit.
pub struct CommitContext<'a> {
    pub repo: &'a RepositoryRow,
    pub branch: &'a str,
    pub actor_user_id: i64,
    pub namespace_quota_bytes: Option<i64>,
    pub namespace_used_bytes: i64,
    pub lfs_config: &'a EffectiveLfsConfig,
    pub auto_gc: bool,
    pub lfs_keep_versions: u32,
    pub body: &'a str,
}

/// The result of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub commit_id: String,
    pub created_at: DateTime<Utc>,
}

/// The versioned-store repository key for `repo`: `<type>/<namespace>/<name>`,
/// matching the string `repo_type` column (spec §3).
#[must_use]
pub fn repo_key(repo: &RepositoryRow) -> String {
    format!("{}/{}/{}", repo.repo_type, repo.namespace, repo.name)
}

/// What a touched path resolves to once every operation in the commit
/// has collapsed to its final value (spec §4.1 step 3).
enum FinalWrite {
    Inline { bytes: Bytes, sha256: String },
    Linked { physical_address: String, checksum: String },
    Delete,
}

struct ResolvedPath {
    path: String,
    size: i64,
    write: FinalWrite,
    lfs: bool,
}

/// Output of [`CommitEngine::plan_writes`]: the quota delta plus one
/// dedup-skip flag per entry in the `resolved` slice it was given, in
/// the same order.
struct WritePlan {
    new_bytes: i64,
    dedup_skips: Vec<bool>,
}

/// Applies NDJSON commit requests against a [`VersionedStore`] and a
/// [`Db`], keeping their state in sync (spec §4.1, §5).
pub struct CommitEngine {
    db: Db,
    vstore: Arc<dyn VersionedStore>,
    blobstore: Arc<dyn BlobStore>,
}

impl CommitEngine {
    #[must_use]
    pub fn new(db: Db, vstore: Arc<dyn VersionedStore>, blobstore: Arc<dyn BlobStore>) -> Self {
        Self { db, vstore, blobstore }
    }

    /// Runs the full 11-step commit algorithm.
    pub async fn commit(&self, ctx: CommitContext<'_>) -> Result<CommitOutcome> {
        let request = parse_ndjson_operations(ctx.body)?;
        let key = repo_key(ctx.repo);

        let resolved = self.resolve_operations(ctx.repo.id, &request.operations, ctx.lfs_config, &key, ctx.branch).await?;

        let plan = self.plan_writes(ctx.repo.id, &resolved).await?;
        self.db
            .check_quota(ctx.repo, ctx.namespace_quota_bytes, ctx.namespace_used_bytes, plan.new_bytes)
            .await?;

        for (rp, dedup_skip) in resolved.iter().zip(&plan.dedup_skips) {
            if *dedup_skip {
                continue;
            }
            match &rp.write {
                FinalWrite::Inline { bytes, .. } => {
                    self.vstore.put_object(&key, ctx.branch, &rp.path, bytes.clone()).await?;
                }
                FinalWrite::Linked { physical_address, checksum } => {
                    self.vstore
                        .link_physical_address(
                            &key,
                            ctx.branch,
                            &rp.path,
                            PhysicalAddress::Linked(physical_address.clone()),
                            checksum,
                            rp.size as u64,
                        )
                        .await?;
                }
                FinalWrite::Delete => {
                    self.vstore.delete_object(&key, ctx.branch, &rp.path).await?;
                }
            }
        }

        let commit_meta = self
            .vstore
            .commit(&key, ctx.branch, &request.header.summary, request.header.description.as_deref())
            .await?;

        let writes: Vec<CommitFileWrite> = resolved
            .iter()
            .map(|rp| match &rp.write {
                FinalWrite::Delete => CommitFileWrite::Delete { path: rp.path.clone() },
                FinalWrite::Inline { sha256, .. } => CommitFileWrite::Upsert {
                    path: rp.path.clone(),
                    size: rp.size,
                    sha256: sha256.clone(),
                    lfs: false,
                },
                FinalWrite::Linked { checksum, .. } => CommitFileWrite::Upsert {
                    path: rp.path.clone(),
                    size: rp.size,
                    sha256: checksum.clone(),
                    lfs: true,
                },
            })
            .collect();

        self.db
            .apply_commit_metadata(
                ctx.repo.id,
                &commit_meta.commit_id,
                ctx.branch,
                ctx.actor_user_id,
                ctx.actor_user_id,
                &request.header.summary,
                request.header.description.as_deref(),
                plan.new_bytes,
                &writes,
            )
            .await?;

        if ctx.auto_gc {
            self.run_gc(ctx.repo.id, &resolved, ctx.lfs_keep_versions).await;
        }

        Ok(CommitOutcome {
            commit_id: commit_meta.commit_id,
            created_at: commit_meta.created_at,
        })
    }

    /// Collapses raw operations into one final write per touched path
    /// (spec §4.1 step 3: "last write to a path wins"), expanding
    /// `deletedFolder` against the current live listing and resolving
    /// `lfsFile`/`copyFile` against the blob store and versioned store.
    async fn resolve_operations(
        &self,
        repo_id: i64,
        operations: &[Operation],
        lfs_config: &EffectiveLfsConfig,
        repo_key: &str,
        branch: &str,
    ) -> Result<Vec<ResolvedPath>> {
        let mut path_ops: HashMap<String, (usize, &Operation)> = HashMap::new();
        let mut folder_deletes: Vec<(String, usize)> = Vec::new();

        for (idx, op) in operations.iter().enumerate() {
            match op {
                Operation::DeletedFolder { path } => folder_deletes.push((path.clone(), idx)),
                _ => {
                    path_ops.insert(op.path().to_string(), (idx, op));
                }
            }
        }

        let mut candidate_paths: HashSet<String> = path_ops.keys().cloned().collect();
        for (prefix, _) in &folder_deletes {
            for row in self.db.list_live_files(repo_id, Some(prefix)).await? {
                candidate_paths.insert(row.path_in_repo);
            }
        }

        let mut resolved = Vec::with_capacity(candidate_paths.len());
        for path in candidate_paths {
            let op_idx = path_ops.get(&path).map(|(i, _)| *i as i64).unwrap_or(-1);
            let delete_idx = folder_deletes
                .iter()
                .filter(|(prefix, _)| path == *prefix || path.starts_with(&format!("{prefix}/")))
                .map(|(_, i)| *i as i64)
                .max();

            if delete_idx.is_some_and(|di| di > op_idx) {
                resolved.push(ResolvedPath { path, size: 0, write: FinalWrite::Delete, lfs: false });
                continue;
            }

            let Some((_, op)) = path_ops.get(&path) else {
                continue;
            };
            resolved.push(self.resolve_one(repo_key, branch, op, lfs_config).await?);
        }

        Ok(resolved)
    }

    async fn resolve_one(
        &self,
        repo_key: &str,
        branch: &str,
        op: &Operation,
        lfs_config: &EffectiveLfsConfig,
    ) -> Result<ResolvedPath> {
        match op {
            Operation::File { path, content } => {
                let size = content.len() as i64;
                if lfs_config.requires_lfs(path, size) {
                    return Err(CommitError::BadRequest(format!(
                        "{path} is {size} bytes, at or above the effective LFS threshold; upload it as an lfsFile"
                    )));
                }
                let sha256 = ContentHash::compute(content).to_hex();
                Ok(ResolvedPath {
                    path: path.clone(),
                    size,
                    write: FinalWrite::Inline { bytes: Bytes::copy_from_slice(content), sha256 },
                    lfs: false,
                })
            }
            Operation::LfsFile { path, oid, size, .. } => {
                let hash = ContentHash::from_hex(oid)
                    .map_err(|_| CommitError::BadRequest(format!("invalid lfs oid: {oid}")))?;
                let key = hash.lfs_key();
                if !self.blobstore.exists(&key).await? {
                    return Err(CommitError::BadRequest(format!(
                        "lfs object {oid} has not been uploaded"
                    )));
                }
                Ok(ResolvedPath {
                    path: path.clone(),
                    size: *size as i64,
                    write: FinalWrite::Linked { physical_address: key, checksum: oid.clone() },
                    lfs: true,
                })
            }
            Operation::DeletedFile { path } => {
                Ok(ResolvedPath { path: path.clone(), size: 0, write: FinalWrite::Delete, lfs: false })
            }
            Operation::DeletedFolder { .. } => unreachable!("folder deletes are handled separately"),
            Operation::CopyFile { path, src_path, src_revision } => {
                let src_ref = src_revision.as_deref().unwrap_or(branch);
                let meta = self.vstore.stat_object(repo_key, src_ref, src_path).await?;
                match meta.physical_address {
                    PhysicalAddress::Linked(addr) => Ok(ResolvedPath {
                        path: path.clone(),
                        size: meta.size as i64,
                        write: FinalWrite::Linked { physical_address: addr, checksum: meta.checksum },
                        lfs: true,
                    }),
                    PhysicalAddress::Inline => {
                        let bytes = self.vstore.get_object(repo_key, src_ref, src_path).await?;
                        Ok(ResolvedPath {
                            path: path.clone(),
                            size: meta.size as i64,
                            write: FinalWrite::Inline { bytes, sha256: meta.checksum },
                            lfs: false,
                        })
                    }
                }
            }
        }
    }

    /// Net byte-usage change this commit would cause, and, per resolved
    /// path, whether the versioned-store write can be skipped because
    /// the content is unchanged from the current live `File` row (spec
    /// §4.1 steps 4-5 dedup, §8 commit-replay law). Mirrors
    /// `kohakuhub-db`'s `upsert_file` dedup formula: only a non-LFS
    /// write onto a non-LFS row with the same sha256 dedups.
    async fn plan_writes(&self, repo_id: i64, resolved: &[ResolvedPath]) -> Result<WritePlan> {
        let mut delta: i64 = 0;
        let mut dedup_skips = Vec::with_capacity(resolved.len());
        for rp in resolved {
            let existing = self.db.get_live_file(repo_id, &rp.path).await?;
            let existing_size = existing.as_ref().map_or(0, |f| f.size);

            let (new_size, dedup_skip) = match &rp.write {
                FinalWrite::Delete => (0, false),
                FinalWrite::Inline { sha256, .. } => {
                    let skip = existing.as_ref().is_some_and(|f| !f.lfs && f.sha256 == *sha256);
                    (rp.size, skip)
                }
                FinalWrite::Linked { .. } => (rp.size, false),
            };
            delta += new_size - existing_size;
            dedup_skips.push(dedup_skip);
        }
        Ok(WritePlan { new_bytes: delta, dedup_skips })
    }

    /// On-demand GC sweep across every live LFS path in a repository,
    /// for operators who disabled `lfs_auto_gc` and want to reclaim
    /// superseded blobs out of band (spec §4.4, `SPEC_FULL.md` §C.5).
    /// Unlike the inline pass, failures here are propagated: an operator
    /// running this explicitly wants to know if it didn't finish.
    pub async fn gc_repository(&self, repo: &RepositoryRow, keep_versions: u32) -> Result<usize> {
        let files = self.db.list_live_files(repo.id, None).await?;
        let mut reclaimed = 0;
        for file in files.into_iter().filter(|f| f.lfs) {
            let candidates = self.db.lfs_gc_candidates(repo.id, &file.path_in_repo, keep_versions).await?;
            for oid in candidates {
                kohakuhub_lfs::delete_object(self.blobstore.as_ref(), &oid).await?;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    /// Best-effort: reclaims superseded LFS blobs for every LFS path
    /// this commit touched (spec §4.4). Failures are logged, not
    /// propagated — the commit itself already succeeded.
    async fn run_gc(&self, repo_id: i64, resolved: &[ResolvedPath], keep_versions: u32) {
        for rp in resolved {
            if !rp.lfs {
                continue;
            }
            let candidates = match self.db.lfs_gc_candidates(repo_id, &rp.path, keep_versions).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %rp.path, error = %e, "gc: failed to list candidates");
                    continue;
                }
            };
            for oid in candidates {
                if let Err(e) = kohakuhub_lfs::delete_object(self.blobstore.as_ref(), &oid).await {
                    warn!(%oid, error = %e, "gc: failed to delete blob");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo_row(threshold: Option<i64>, suffix_rules: serde_json::Value) -> RepositoryRow {
        RepositoryRow {
            id: 1,
            repo_type: "model".into(),
            namespace: "alice".into(),
            name: "demo".into(),
            normalized_namespace: "alice".into(),
            normalized_name: "demo".into(),
            private: false,
            owner_id: 1,
            quota_bytes: None,
            used_bytes: 0,
            lfs_threshold_bytes: threshold,
            lfs_keep_versions: None,
            lfs_suffix_rules: suffix_rules,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn repo_key_joins_type_namespace_name() {
        let repo = repo_row(None, json!([]));
        assert_eq!(repo_key(&repo), "model/alice/demo");
    }

    #[test]
    fn effective_config_falls_back_to_default_threshold() {
        let repo = repo_row(None, json!([]));
        let cfg = EffectiveLfsConfig::from_repo(&repo, 10_000_000);
        assert_eq!(cfg.threshold_bytes, 10_000_000);
        assert!(!cfg.requires_lfs("small.txt", 100));
        assert!(cfg.requires_lfs("big.bin", 10_000_000));
    }

    #[test]
    fn effective_config_prefers_repo_override() {
        let repo = repo_row(Some(1_000), json!([".safetensors"]));
        let cfg = EffectiveLfsConfig::from_repo(&repo, 10_000_000);
        assert_eq!(cfg.threshold_bytes, 1_000);
        assert!(cfg.requires_lfs("weights.safetensors", 10));
    }
}
