//! Postgres-backed implementations of the engine's repository ports.
//!
//! Mirrors the teacher's `iqrah_backend_storage` crate: one file per
//! repository, `#[derive(sqlx::FromRow)]` row types that never leak past
//! the `TryFrom`/`From` boundary into domain types, and a handful of
//! top-level pool/migration helpers used by `main.rs`.

pub mod assignment_repository;
pub mod audit_repository;
pub mod contractor_repository;
pub mod distance_cache_repository;
pub mod error;
pub mod event_log_repository;
pub mod job_repository;
pub mod weights_repository;

pub use assignment_repository::PgAssignmentRepository;
pub use audit_repository::PgAuditRepository;
pub use contractor_repository::PgContractorRepository;
pub use distance_cache_repository::PgDistanceCacheRepository;
pub use error::StorageError;
pub use event_log_repository::PgEventLogRepository;
pub use job_repository::PgJobRepository;
pub use weights_repository::PgWeightsConfigRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool, StorageError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(StorageError::Connection)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(StorageError::Migration)
}

/// Check database connectivity.
pub async fn check_connection(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(StorageError::Query)?;
    Ok(())
}
