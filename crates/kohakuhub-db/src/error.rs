use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("quota exceeded: would use {used} of {quota} bytes")]
    QuotaExceeded { used: i64, quota: i64 },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Maps a unique-violation from an insert into [`DbError::AlreadyExists`],
    /// leaving every other sqlx error to pass through untouched.
    pub fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return DbError::AlreadyExists(what.into());
            }
        }
        DbError::Sqlx(err)
    }
}
