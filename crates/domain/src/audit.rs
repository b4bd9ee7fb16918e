//! AuditRecommendation — the append-only record of a recommendation request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditActor {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub availability: u32,
    pub rating: u32,
    pub distance: u32,
    pub rotation: u32,
    pub final_score: u32,
    pub rationale: String,
}

/// A candidate considered during a recommendation run, whether or not it
/// made the final ranked list (dropped candidates carry `drop_reason`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub contractor_id: Uuid,
    pub score: Option<ScoreBreakdown>,
    pub drop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecommendation {
    pub id: Uuid,
    pub job_id: Uuid,
    pub request_snapshot: serde_json::Value,
    pub candidates: Vec<CandidateRecord>,
    pub selected_contractor_id: Option<Uuid>,
    pub actor: AuditActor,
    pub config_version: u32,
    pub created_at: DateTime<Utc>,
    pub degraded: bool,
}
