//! Repository rows: creation, lookup, and quota bookkeeping (spec §3, §4.8).

use crate::{Db, DbError, RepositoryRow, Result};
use serde_json::Value;

/// Case/separator fold used for uniqueness checks within `(repo_type, namespace)`.
#[must_use]
pub fn normalize(s: &str) -> String {
    s.to_lowercase().replace(['-', '_', '.'], "")
}

impl Db {
    pub async fn create_repository(
        &self,
        repo_type: &str,
        namespace: &str,
        name: &str,
        private: bool,
        owner_id: i64,
    ) -> Result<RepositoryRow> {
        sqlx::query_as::<_, RepositoryRow>(
            r#"
            INSERT INTO repositories
                (repo_type, namespace, name, normalized_namespace, normalized_name, private, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(repo_type)
        .bind(namespace)
        .bind(name)
        .bind(normalize(namespace))
        .bind(normalize(name))
        .bind(private)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, format!("{repo_type}/{namespace}/{name}")))
    }

    pub async fn get_repository(
        &self,
        repo_type: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RepositoryRow>> {
        sqlx::query_as::<_, RepositoryRow>(
            r#"
            SELECT * FROM repositories
            WHERE repo_type = $1 AND normalized_namespace = $2 AND normalized_name = $3
            "#,
        )
        .bind(repo_type)
        .bind(normalize(namespace))
        .bind(normalize(name))
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// Resolves `(namespace, name)` to a repository without a `repo_type`
    /// segment, for the Git Smart HTTP and LFS transports (spec §4.3,
    /// §4.4), whose URLs are `/{namespace}/{name}.git/...` with no type
    /// in the path. Repos are keyed by `(repo_type, namespace, name)` and
    /// the same name can exist as a model, dataset, and space
    /// simultaneously (spec §3), so this tries `model`, then `dataset`,
    /// then `space`, in that fixed order, and returns the first match.
    pub async fn get_repository_by_namespace_name(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RepositoryRow>> {
        for repo_type in ["model", "dataset", "space"] {
            if let Some(repo) = self.get_repository(repo_type, namespace, name).await? {
                return Ok(Some(repo));
            }
        }
        Ok(None)
    }

    pub async fn get_repository_by_id(&self, id: i64) -> Result<Option<RepositoryRow>> {
        sqlx::query_as::<_, RepositoryRow>("SELECT * FROM repositories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    pub async fn delete_repository(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM repositories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_namespace_repositories(
        &self,
        namespace: &str,
        repo_type: Option<&str>,
    ) -> Result<Vec<RepositoryRow>> {
        sqlx::query_as::<_, RepositoryRow>(
            r#"
            SELECT * FROM repositories
            WHERE normalized_namespace = $1 AND ($2::text IS NULL OR repo_type = $2)
            ORDER BY name
            "#,
        )
        .bind(normalize(namespace))
        .bind(repo_type)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)
    }

    pub async fn update_repository_settings(
        &self,
        id: i64,
        private: Option<bool>,
        quota_bytes: Option<Option<i64>>,
        lfs_threshold_bytes: Option<Option<i64>>,
        lfs_keep_versions: Option<Option<i32>>,
        lfs_suffix_rules: Option<Value>,
    ) -> Result<RepositoryRow> {
        let current = self
            .get_repository_by_id(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("repository {id}")))?;

        sqlx::query_as::<_, RepositoryRow>(
            r#"
            UPDATE repositories SET
                private = $2,
                quota_bytes = $3,
                lfs_threshold_bytes = $4,
                lfs_keep_versions = $5,
                lfs_suffix_rules = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(private.unwrap_or(current.private))
        .bind(quota_bytes.unwrap_or(current.quota_bytes))
        .bind(lfs_threshold_bytes.unwrap_or(current.lfs_threshold_bytes))
        .bind(lfs_keep_versions.unwrap_or(current.lfs_keep_versions))
        .bind(lfs_suffix_rules.unwrap_or(current.lfs_suffix_rules))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// Adds `delta_bytes` (may be negative, e.g. on delete/GC) to a
    /// repository's `used_bytes`, returning the new total.
    pub async fn adjust_repository_usage(&self, id: i64, delta_bytes: i64) -> Result<i64> {
        let (used,): (i64,) = sqlx::query_as(
            "UPDATE repositories SET used_bytes = used_bytes + $2, updated_at = now() WHERE id = $1 RETURNING used_bytes",
        )
        .bind(id)
        .bind(delta_bytes)
        .fetch_one(&self.pool)
        .await?;
        Ok(used)
    }

    /// Every repository id, for the periodic quota recompute sweep.
    pub async fn all_repository_ids(&self) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM repositories").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Recomputes `used_bytes` from the sum of live (non-deleted)
    /// `files` rows, correcting any drift the additive fast path
    /// (`adjust_repository_usage`) may have accumulated (spec §5).
    pub async fn recompute_used_bytes(&self, id: i64) -> Result<i64> {
        let (used,): (i64,) = sqlx::query_as(
            r#"
            UPDATE repositories
            SET used_bytes = COALESCE(
                    (SELECT SUM(size) FROM files WHERE repository_id = $1 AND NOT is_deleted),
                    0
                ),
                updated_at = now()
            WHERE id = $1
            RETURNING used_bytes
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(used)
    }

    /// Checks `new_bytes` against the repository's effective quota,
    /// falling back to the owning namespace's quota when the repo has
    /// none set (spec §3: `quota_bytes` nullable = inherit).
    pub async fn check_quota(
        &self,
        repo: &RepositoryRow,
        namespace_quota_bytes: Option<i64>,
        namespace_used_bytes: i64,
        new_bytes: i64,
    ) -> Result<()> {
        if let Some(quota) = repo.quota_bytes {
            let projected = repo.used_bytes + new_bytes;
            if projected > quota {
                return Err(DbError::QuotaExceeded { used: projected, quota });
            }
            return Ok(());
        }
        if let Some(quota) = namespace_quota_bytes {
            let projected = namespace_used_bytes + new_bytes;
            if projected > quota {
                return Err(DbError::QuotaExceeded { used: projected, quota });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_separators() {
        assert_eq!(normalize("My-Repo_Name.v2"), "myreponamev2");
        assert_eq!(normalize("my-repo-name-v2"), normalize("My_Repo.Name.V2"));
    }

    fn repo(quota_bytes: Option<i64>, used_bytes: i64) -> RepositoryRow {
        RepositoryRow {
            id: 1,
            repo_type: "model".into(),
            namespace: "alice".into(),
            name: "demo".into(),
            normalized_namespace: "alice".into(),
            normalized_name: "demo".into(),
            private: false,
            owner_id: 1,
            quota_bytes,
            used_bytes,
            lfs_threshold_bytes: None,
            lfs_keep_versions: None,
            lfs_suffix_rules: serde_json::json!([]),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn quota_check_is_pure_below_limit() {
        // check_quota only touches its arguments, never the pool, so it's
        // safe to call without a live database.
        let db = Db::from_pool(sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap());
        let r = repo(Some(100), 50);
        assert!(db.check_quota(&r, None, 0, 40).await.is_ok());
        assert!(db.check_quota(&r, None, 0, 60).await.is_err());
    }

    #[tokio::test]
    async fn quota_check_falls_back_to_namespace_quota() {
        let db = Db::from_pool(sqlx::PgPool::connect_lazy("postgres://unused/unused").unwrap());
        let r = repo(None, 0);
        assert!(db.check_quota(&r, Some(100), 90, 5).await.is_ok());
        assert!(db.check_quota(&r, Some(100), 90, 20).await.is_err());
        assert!(db.check_quota(&r, None, 90, 1_000_000).await.is_ok());
    }
}
