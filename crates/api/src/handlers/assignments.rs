//! `POST /jobs/{id}/assign` (§6).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use smartscheduler_domain::assignment::Assignment;
use smartscheduler_domain::errors::DomainError;
use smartscheduler_domain::requests::{AssignRequest, validate_assign_request};

use crate::AppState;

pub async fn assign(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Assignment>, DomainError> {
    if let Err(errors) = validate_assign_request(&request) {
        return Err(DomainError::InvalidRequestMulti(errors));
    }

    tracing::info!(job_id = %job_id, contractor_id = %request.contractor_id, "assignment requested");
    let assignment = state.assignment_tx.assign(job_id, request).await?;
    tracing::info!(assignment_id = %assignment.id, "assignment booked");

    Ok(Json(assignment))
}
