//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`]. At the store seam they are
//! folded into the controller's [`StoreError`] so the controller never sees
//! `sqlx` types.

use agegate_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            // The server answered and refused the row (constraint, trigger,
            // permission).
            DbError::Postgres(sqlx::Error::Database(db)) => Self::Rejected(db.message().to_owned()),
            DbError::Postgres(e) => Self::Unavailable(e.to_string()),
            DbError::Migration(e) => Self::Unavailable(e.to_string()),
            DbError::Config(msg) => Self::Unavailable(msg),
        }
    }
}
