//! File rows: dedup-aware upsert and soft-delete (spec §3, §4.1 step 10).

use crate::{Db, DbError, FileRow, Result};

impl Db {
    /// Looks up the live (non-deleted) file at `path_in_repo`, if any.
    pub async fn get_live_file(&self, repository_id: i64, path_in_repo: &str) -> Result<Option<FileRow>> {
        sqlx::query_as::<_, FileRow>(
            "SELECT * FROM files WHERE repository_id = $1 AND path_in_repo = $2 AND NOT is_deleted",
        )
        .bind(repository_id)
        .bind(path_in_repo)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)
    }

    pub async fn list_live_files(&self, repository_id: i64, prefix: Option<&str>) -> Result<Vec<FileRow>> {
        sqlx::query_as::<_, FileRow>(
            r#"
            SELECT * FROM files
            WHERE repository_id = $1 AND NOT is_deleted
              AND ($2::text IS NULL OR path_in_repo = $2 OR path_in_repo LIKE $2 || '/%')
            ORDER BY path_in_repo
            "#,
        )
        .bind(repository_id)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// Upserts the live row at `path_in_repo`: if a non-deleted row
    /// exists, updates it in place (a path has at most one live row,
    /// enforced by `files_repo_path_live_idx`); otherwise inserts one.
    /// Returns the row together with whether this write was a no-op
    /// dedup skip (same sha256, not previously LFS, per spec §4.1 step 4).
    pub async fn upsert_file(
        &self,
        repository_id: i64,
        path_in_repo: &str,
        size: i64,
        sha256: &str,
        lfs: bool,
        owner_id: i64,
    ) -> Result<(FileRow, bool)> {
        if let Some(existing) = self.get_live_file(repository_id, path_in_repo).await? {
            let dedup_skip = existing.sha256 == sha256 && !existing.lfs && !lfs;
            if dedup_skip {
                return Ok((existing, true));
            }
            let updated = sqlx::query_as::<_, FileRow>(
                r#"
                UPDATE files SET size = $2, sha256 = $3, lfs = $4, owner_id = $5, updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(existing.id)
            .bind(size)
            .bind(sha256)
            .bind(lfs)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
            return Ok((updated, false));
        }

        let inserted = sqlx::query_as::<_, FileRow>(
            r#"
            INSERT INTO files (repository_id, path_in_repo, size, sha256, lfs, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(repository_id)
        .bind(path_in_repo)
        .bind(size)
        .bind(sha256)
        .bind(lfs)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((inserted, false))
    }

    /// Soft-deletes the live row at `path_in_repo`, if one exists.
    pub async fn soft_delete_file(&self, repository_id: i64, path_in_repo: &str) -> Result<()> {
        sqlx::query(
            "UPDATE files SET is_deleted = true, updated_at = now() WHERE repository_id = $1 AND path_in_repo = $2 AND NOT is_deleted",
        )
        .bind(repository_id)
        .bind(path_in_repo)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Soft-deletes every live row whose path is `prefix` or begins
    /// with `prefix/`, for `deletedFolder` operations.
    pub async fn soft_delete_folder(&self, repository_id: i64, prefix: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE files SET is_deleted = true, updated_at = now()
            WHERE repository_id = $1 AND NOT is_deleted
              AND (path_in_repo = $2 OR path_in_repo LIKE $2 || '/%')
            "#,
        )
        .bind(repository_id)
        .bind(prefix)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
