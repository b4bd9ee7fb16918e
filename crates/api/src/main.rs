//! SmartScheduler server binary: explicit construction graph, then serve.

use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartscheduler_api::{AppState, build_router};
use smartscheduler_config::AppConfig;
use smartscheduler_engine::{AssignmentTransaction, Coordinator, DistanceCache, DistanceService, EventSink};
use smartscheduler_engine::clock::{SystemClock, UuidProvider};
use smartscheduler_storage::{
    PgAssignmentRepository, PgAuditRepository, PgContractorRepository, PgDistanceCacheRepository,
    PgEventLogRepository, PgJobRepository, PgWeightsConfigRepository, check_connection, create_pool,
    run_migrations,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting SmartScheduler server");

    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    tracing::info!("database connection pool created");

    run_migrations(&pool).await?;
    tracing::info!("database migrations complete");

    check_connection(&pool).await?;

    let contractors = Arc::new(PgContractorRepository::new(pool.clone()));
    let jobs = Arc::new(PgJobRepository::new(pool.clone()));
    let assignments = Arc::new(PgAssignmentRepository::new(pool.clone()));
    let audits = Arc::new(PgAuditRepository::new(pool.clone()));
    let event_log = Arc::new(PgEventLogRepository::new(pool.clone()));
    let weights_repo = Arc::new(PgWeightsConfigRepository::new(pool.clone()));
    let distance_cache_repo = Arc::new(PgDistanceCacheRepository::new(pool.clone()));

    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UuidProvider);

    let routing_provider = Arc::new(smartscheduler_engine::FakeRoutingProvider::default());
    let distance_service = Arc::new(
        DistanceService::new(Arc::new(DistanceCache::new()), routing_provider)
            .with_persistence(distance_cache_repo),
    );

    let event_sink = Arc::new(EventSink::new(event_log.clone(), clock.clone(), ids.clone()));

    let coordinator = Arc::new(Coordinator::new(
        contractors.clone(),
        jobs.clone(),
        assignments.clone(),
        audits.clone(),
        weights_repo.clone(),
        distance_service,
        event_sink.clone(),
        clock.clone(),
        ids.clone(),
    ));

    let assignment_tx = Arc::new(AssignmentTransaction::new(
        contractors,
        jobs,
        assignments,
        audits.clone(),
        weights_repo,
        event_sink,
        clock,
        ids,
    ));

    let state = Arc::new(AppState {
        pool,
        coordinator,
        assignment_tx,
        audit_repo: audits,
        config: config.clone(),
        start_time: Instant::now(),
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
