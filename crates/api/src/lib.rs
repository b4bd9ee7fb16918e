//! SmartScheduler HTTP surface: axum routes wired to the explicit
//! construction graph built in `main` (§9 — no service locator).

pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use smartscheduler_config::AppConfig;
use smartscheduler_engine::{AssignmentTransaction, Coordinator};
use smartscheduler_engine::ports::AuditRepository;

use handlers::assignments::assign;
use handlers::health::{health, ready};
use handlers::recommendations::{latest, recalculate, recommend};

/// Flat struct of collaborators, built once in `main`. Every handler reads
/// from this rather than looking anything up through a container.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub coordinator: Arc<Coordinator>,
    pub assignment_tx: Arc<AssignmentTransaction>,
    pub audit_repo: Arc<dyn AuditRepository>,
    pub config: AppConfig,
    pub start_time: Instant,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/readyz", get(ready))
        .route("/recommendations", post(recommend))
        .route("/recommendations/latest", get(latest))
        .route("/recommendations/recalculate", post(recalculate))
        .route("/jobs/{id}/assign", post(assign))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
