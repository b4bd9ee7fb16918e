//! Storage errors.

use thiserror::Error;

use smartscheduler_domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    #[error("query error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("row decode error: {0}")]
    Decode(String),
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::Query(sqlx::Error::RowNotFound) => DomainError::NotFound(err.to_string()),
            _ => DomainError::Fatal(err.to_string()),
        }
    }
}
