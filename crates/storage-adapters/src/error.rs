//! # StorageError
//!
//! Adapter-level failures. They never cross the port boundary: everything is
//! folded into [`DomainError`] before a repository call returns.

use domains::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[cfg(feature = "db-postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "db-postgres")]
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[cfg(feature = "redis")]
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[cfg(feature = "redis")]
    #[error("redis pool setup failed: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value no longer parses into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        #[cfg(feature = "db-postgres")]
        if let StorageError::Database(sqlx::Error::Database(db)) = &err {
            if db.is_unique_violation() {
                let key = db.constraint().unwrap_or("unique key").to_string();
                return DomainError::Conflict(format!("{key} is already taken"));
            }
        }
        DomainError::backend(err)
    }
}
