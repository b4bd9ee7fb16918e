//! `POST /recommendations`, `GET /recommendations/latest`,
//! `POST /recommendations/recalculate` (§6).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use smartscheduler_domain::audit::AuditRecommendation;
use smartscheduler_domain::errors::DomainError;
use smartscheduler_domain::requests::{RecommendRequest, RecommendResponse, validate_recommend_request};

use crate::AppState;

pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, DomainError> {
    if let Err(errors) = validate_recommend_request(&request) {
        return Err(DomainError::InvalidRequestMulti(errors));
    }

    tracing::info!(job_id = %request.job_id, "recommendation requested");
    let response = state.coordinator.recommend(request).await?;
    tracing::info!(request_id = %response.request_id, degraded = response.degraded, "recommendation produced");

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub job_id: Uuid,
}

pub async fn latest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<AuditRecommendation>, DomainError> {
    let audit = state
        .audit_repo
        .latest_for_job(query.job_id)
        .await
        .map_err(|e| DomainError::Fatal(e.to_string()))?
        .ok_or_else(|| DomainError::NotFound(format!("no recommendation audit for job {}", query.job_id)))?;

    Ok(Json(audit))
}

#[derive(Debug, Deserialize)]
pub struct RecalculateRequest {
    pub job_id: Uuid,
}

/// Enqueues a fresh recommendation run. The coordinator's own deadline
/// budget bounds the work; this handler just fires it and responds 202
/// without waiting on the ranked list (§6 "responds 202").
pub async fn recalculate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecalculateRequest>,
) -> impl IntoResponse {
    let coordinator = state.coordinator.clone();
    let job_id = request.job_id;

    tokio::spawn(async move {
        let request = RecommendRequest { job_id, desired_date: None, service_window: None, max_results: None };
        if let Err(err) = coordinator.recommend(request).await {
            tracing::warn!(job_id = %job_id, error = %err, "recalculate run failed");
        }
    });

    StatusCode::ACCEPTED
}
