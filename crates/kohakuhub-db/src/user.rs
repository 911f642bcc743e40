//! Users, sessions, and API tokens (spec §3 "Session / Token / User").

use crate::{Db, DbError, Result, SessionRow, TokenRow, UserRow};
use chrono::{DateTime, Utc};

impl Db {
    pub async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, username))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE lower(username) = lower($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    pub async fn adjust_user_usage(&self, id: i64, delta_bytes: i64) -> Result<i64> {
        let (used,): (i64,) =
            sqlx::query_as("UPDATE users SET used_bytes = used_bytes + $2 WHERE id = $1 RETURNING used_bytes")
                .bind(id)
                .bind(delta_bytes)
                .fetch_one(&self.pool)
                .await?;
        Ok(used)
    }

    pub async fn create_session(&self, id: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<SessionRow> {
        sqlx::query_as::<_, SessionRow>(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)
    }

    /// Returns the session only if it exists and has not expired as of
    /// `now` (the caller passes it in; this crate never calls `Utc::now()`
    /// itself so callers can test with fixed clocks).
    pub async fn get_valid_session(&self, id: &str, now: DateTime<Utc>) -> Result<Option<SessionRow>> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1 AND expires_at > $2")
            .bind(id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_token(&self, user_id: i64, name: &str, token_hash: &str) -> Result<TokenRow> {
        sqlx::query_as::<_, TokenRow>(
            "INSERT INTO tokens (user_id, name, token_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, name))
    }

    pub async fn get_token_by_hash(&self, token_hash: &str) -> Result<Option<TokenRow>> {
        sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)
    }

    pub async fn touch_token(&self, id: i64, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_token(&self, id: i64, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tokens WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_user_tokens(&self, user_id: i64) -> Result<Vec<TokenRow>> {
        sqlx::query_as::<_, TokenRow>("SELECT * FROM tokens WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)
    }
}
