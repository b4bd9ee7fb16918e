//! Assignment entity — the result of a successful booking transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contractor::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, AssignmentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub contractor_id: Uuid,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub source: AssignmentSource,
    pub audit_id: Option<Uuid>,
    pub status: AssignmentStatus,
    /// Denormalized from the job at write time so the availability engine
    /// can derive a travel buffer (§4.3) without a second lookup.
    pub job_location: GeoPoint,
}

impl Assignment {
    pub fn overlaps(&self, other_start: DateTime<Utc>, other_end: DateTime<Utc>) -> bool {
        self.start_utc < other_end && self.end_utc > other_start
    }
}
