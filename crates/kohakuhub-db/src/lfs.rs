//! LFS object history and the version-retention half of garbage collection
//! (spec §3 "LFS Object History", §4.4 "Garbage collection").
//!
//! Physical blob deletion itself lives in `kohakuhub-lfs`; this module only
//! answers "which oids are safe to reclaim" from the DB's point of view.

use crate::{Db, DbError, LfsObjectHistoryRow, Result};

impl Db {
    pub async fn insert_lfs_history(
        &self,
        repository_id: i64,
        path_in_repo: &str,
        sha256: &str,
        size: i64,
        commit_id: &str,
    ) -> Result<LfsObjectHistoryRow> {
        sqlx::query_as::<_, LfsObjectHistoryRow>(
            r#"
            INSERT INTO lfs_object_history (repository_id, path_in_repo, sha256, size, commit_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(repository_id)
        .bind(path_in_repo)
        .bind(sha256)
        .bind(size)
        .bind(commit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// Distinct oids ever seen at `(repository_id, path_in_repo)`, most
    /// recently committed first.
    pub async fn lfs_path_oids(&self, repository_id: i64, path_in_repo: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT sha256
            FROM (
                SELECT sha256, MAX(created_at) AS last_seen
                FROM lfs_object_history
                WHERE repository_id = $1 AND path_in_repo = $2
                GROUP BY sha256
            ) t
            ORDER BY last_seen DESC
            "#,
        )
        .bind(repository_id)
        .bind(path_in_repo)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    /// True if `sha256` is still referenced by any live, non-deleted LFS
    /// file row anywhere in the hub (global dedup per spec §3).
    pub async fn lfs_oid_is_live(&self, sha256: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM files WHERE sha256 = $1 AND lfs AND NOT is_deleted")
                .bind(sha256)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Candidate oids for physical deletion at `(repository_id,
    /// path_in_repo)`: everything older than the `keep_versions` most
    /// recent unique oids that is not currently live anywhere.
    pub async fn lfs_gc_candidates(
        &self,
        repository_id: i64,
        path_in_repo: &str,
        keep_versions: u32,
    ) -> Result<Vec<String>> {
        let oids = self.lfs_path_oids(repository_id, path_in_repo).await?;
        let mut candidates = Vec::new();
        for oid in oids.into_iter().skip(keep_versions as usize) {
            if !self.lfs_oid_is_live(&oid).await? {
                candidates.push(oid);
            }
        }
        Ok(candidates)
    }
}
