//! Ephemeral rows for in-progress LFS uploads (spec §3 "Staging Upload").

use crate::{Db, DbError, Result, StagingUploadRow};

impl Db {
    pub async fn create_staging_upload(
        &self,
        repository_id: i64,
        sha256: &str,
        size: i64,
        storage_key: &str,
        upload_id: Option<&str>,
    ) -> Result<StagingUploadRow> {
        sqlx::query_as::<_, StagingUploadRow>(
            r#"
            INSERT INTO staging_uploads (repository_id, sha256, size, storage_key, upload_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (repository_id, sha256) DO UPDATE SET
                size = EXCLUDED.size, storage_key = EXCLUDED.storage_key, upload_id = EXCLUDED.upload_id
            RETURNING *
            "#,
        )
        .bind(repository_id)
        .bind(sha256)
        .bind(size)
        .bind(storage_key)
        .bind(upload_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    pub async fn get_staging_upload(&self, repository_id: i64, sha256: &str) -> Result<Option<StagingUploadRow>> {
        sqlx::query_as::<_, StagingUploadRow>(
            "SELECT * FROM staging_uploads WHERE repository_id = $1 AND sha256 = $2",
        )
        .bind(repository_id)
        .bind(sha256)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// Removes the staging row once its referencing commit has
    /// succeeded and it has become a `File` row (spec §3 lifecycle).
    pub async fn promote_staging_upload(&self, repository_id: i64, sha256: &str) -> Result<()> {
        sqlx::query("DELETE FROM staging_uploads WHERE repository_id = $1 AND sha256 = $2")
            .bind(repository_id)
            .bind(sha256)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Expires staging rows older than `older_than`, for uploads whose
    /// commit never arrived (spec §4.1 "Atomicity").
    pub async fn expire_staging_uploads(&self, older_than: chrono::DateTime<chrono::Utc>) -> Result<Vec<StagingUploadRow>> {
        sqlx::query_as::<_, StagingUploadRow>(
            "DELETE FROM staging_uploads WHERE created_at < $1 RETURNING *",
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)
    }
}
