//! Postgres-backed persistence for KohakuHub.
//!
//! The versioned store and blob store are the source of truth for path
//! existence and physical bytes (spec §3 "Ownership / Identity"); this
//! crate owns attribution, quotas, dedup indices, and LFS history on top
//! of them. Queries are written with `sqlx::query_as` against a runtime
//! `PgPool` rather than the `query!` macro family, since there is no
//! live database to check them against at build time.

mod commit;
mod error;
mod file;
mod lfs;
mod models;
mod organization;
mod repository;
mod staging;
mod user;

pub use commit::CommitFileWrite;
pub use error::{DbError, Result};
pub use models::{
    CommitRow, FileRow, LfsObjectHistoryRow, OrgMemberRow, OrganizationRow, RepositoryRow,
    SessionRow, StagingUploadRow, TokenRow, UserRow,
};
pub use repository::normalize as normalize_name;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// A handle to the KohakuHub Postgres database.
///
/// Cheap to clone: wraps a connection pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connects to `database_url`, running pending migrations first.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Wraps an already-connected pool (used by callers managing their
    /// own pool lifecycle, and by integration tests against a pre-seeded
    /// database).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
