//! Commit rows: one per successful versioned-store commit (spec §3, §4.1 step 10).

use crate::{CommitRow, Db, DbError, FileRow, Result};

/// One file's outcome within a commit, for the atomic metadata write
/// (spec §4.1 step 10).
pub enum CommitFileWrite {
    Delete { path: String },
    Upsert { path: String, size: i64, sha256: String, lfs: bool },
}

impl Db {
    /// Writes every file row, LFS history row, the commit row, and the
    /// repository usage delta for one commit inside a single
    /// transaction (spec §4.1 step 10), so a failure partway through
    /// never leaves metadata half-applied alongside an already-committed
    /// versioned-store revision.
    pub async fn apply_commit_metadata(
        &self,
        repository_id: i64,
        commit_id: &str,
        branch: &str,
        author_id: i64,
        committer_id: i64,
        message: &str,
        description: Option<&str>,
        usage_delta: i64,
        writes: &[CommitFileWrite],
    ) -> Result<CommitRow> {
        let mut tx = self.pool.begin().await?;

        for write in writes {
            match write {
                CommitFileWrite::Delete { path } => {
                    sqlx::query(
                        "UPDATE files SET is_deleted = true, updated_at = now() \
                         WHERE repository_id = $1 AND path_in_repo = $2 AND NOT is_deleted",
                    )
                    .bind(repository_id)
                    .bind(path)
                    .execute(&mut *tx)
                    .await?;
                }
                CommitFileWrite::Upsert { path, size, sha256, lfs } => {
                    let existing = sqlx::query_as::<_, FileRow>(
                        "SELECT * FROM files WHERE repository_id = $1 AND path_in_repo = $2 AND NOT is_deleted",
                    )
                    .bind(repository_id)
                    .bind(path)
                    .fetch_optional(&mut *tx)
                    .await?;

                    let dedup_skip =
                        existing.as_ref().is_some_and(|f| f.sha256 == *sha256 && !f.lfs && !*lfs);

                    if !dedup_skip {
                        if let Some(existing) = &existing {
                            sqlx::query(
                                r#"
                                UPDATE files SET size = $2, sha256 = $3, lfs = $4, owner_id = $5, updated_at = now()
                                WHERE id = $1
                                "#,
                            )
                            .bind(existing.id)
                            .bind(size)
                            .bind(sha256)
                            .bind(lfs)
                            .bind(author_id)
                            .execute(&mut *tx)
                            .await?;
                        } else {
                            sqlx::query(
                                r#"
                                INSERT INTO files (repository_id, path_in_repo, size, sha256, lfs, owner_id)
                                VALUES ($1, $2, $3, $4, $5, $6)
                                "#,
                            )
                            .bind(repository_id)
                            .bind(path)
                            .bind(size)
                            .bind(sha256)
                            .bind(lfs)
                            .bind(author_id)
                            .execute(&mut *tx)
                            .await?;
                        }
                    }

                    if *lfs {
                        sqlx::query(
                            r#"
                            INSERT INTO lfs_object_history (repository_id, path_in_repo, sha256, size, commit_id)
                            VALUES ($1, $2, $3, $4, $5)
                            "#,
                        )
                        .bind(repository_id)
                        .bind(path)
                        .bind(sha256)
                        .bind(size)
                        .bind(commit_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }

        let commit = sqlx::query_as::<_, CommitRow>(
            r#"
            INSERT INTO commits (repository_id, commit_id, branch, author_id, committer_id, message, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(repository_id)
        .bind(commit_id)
        .bind(branch)
        .bind(author_id)
        .bind(committer_id)
        .bind(message)
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query("UPDATE repositories SET used_bytes = used_bytes + $2, updated_at = now() WHERE id = $1")
            .bind(repository_id)
            .bind(usage_delta)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(commit)
    }

    pub async fn insert_commit(
        &self,
        repository_id: i64,
        commit_id: &str,
        branch: &str,
        author_id: i64,
        committer_id: i64,
        message: &str,
        description: Option<&str>,
    ) -> Result<CommitRow> {
        sqlx::query_as::<_, CommitRow>(
            r#"
            INSERT INTO commits (repository_id, commit_id, branch, author_id, committer_id, message, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(repository_id)
        .bind(commit_id)
        .bind(branch)
        .bind(author_id)
        .bind(committer_id)
        .bind(message)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    pub async fn list_commits(
        &self,
        repository_id: i64,
        branch: &str,
        limit: i64,
        before_created_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<CommitRow>> {
        sqlx::query_as::<_, CommitRow>(
            r#"
            SELECT * FROM commits
            WHERE repository_id = $1 AND branch = $2
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(repository_id)
        .bind(branch)
        .bind(before_created_at)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)
    }

    pub async fn get_commit(&self, repository_id: i64, commit_id: &str) -> Result<Option<CommitRow>> {
        sqlx::query_as::<_, CommitRow>("SELECT * FROM commits WHERE repository_id = $1 AND commit_id = $2")
            .bind(repository_id)
            .bind(commit_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    /// Every `(commit_id, author_username)` pair recorded for a repo, for
    /// the Git Smart HTTP synthesizer's commit author line (spec §4.3:
    /// `"<username> <noreply@hub.local> <unix-ts> +0000"`).
    pub async fn list_commit_authors(&self, repository_id: i64) -> Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT c.commit_id, u.username
            FROM commits c
            JOIN users u ON u.id = c.author_id
            WHERE c.repository_id = $1
            "#,
        )
        .bind(repository_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows)
    }
}
