//! Request/response DTOs for the wire shape described in §6, plus the pure
//! validation functions mandated by the REDESIGN FLAG in §9: validation is a
//! small set of plain functions invoked by the coordinator/transaction
//! before any I/O, not attribute/decorator-driven.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::ServiceWindow;

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub job_id: Uuid,
    #[serde(default)]
    pub desired_date: Option<NaiveDate>,
    #[serde(default)]
    pub service_window: Option<ServiceWindow>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Validate a `RecommendRequest` against plain invariants. Returns all
/// violations found rather than short-circuiting on the first, matching the
/// batched-validation-errors shape the API returns.
pub fn validate_recommend_request(req: &RecommendRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if let Some(sw) = req.service_window {
        if !sw.is_ordered() {
            errors.push("service_window.start must be before service_window.end".to_string());
        }
    }
    if let Some(max) = req.max_results {
        if max == 0 {
            errors.push("max_results must be at least 1".to_string());
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestedSlot {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub slot_type: SlotType,
    pub confidence: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Earliest,
    LowestTravel,
    HighestConfidence,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedContractor {
    pub contractor_id: Uuid,
    pub contractor_name: String,
    pub score: u32,
    pub score_breakdown: crate::audit::ScoreBreakdown,
    pub rationale: String,
    pub suggested_slots: Vec<SuggestedSlot>,
    pub distance_m: f64,
    pub eta_min: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub request_id: Uuid,
    pub job_id: Uuid,
    pub recommendations: Vec<RankedContractor>,
    pub config_version: u32,
    pub generated_at: DateTime<Utc>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub contractor_id: Uuid,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    #[serde(default)]
    pub actor: Option<String>,
}

pub fn validate_assign_request(req: &AssignRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if req.end_utc <= req.start_utc {
        errors.push("end_utc must be after start_utc".to_string());
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub contractor_id: Uuid,
    pub new_start_utc: DateTime<Utc>,
    pub new_end_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}
