//! Job entity and supporting value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::contractor::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Normal,
    High,
    Rush,
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

/// Computed, never stored directly: derived from the set of active
/// assignments for the job (§3, §9 open question on multi-contractor jobs).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobAssignmentStatus {
    Unassigned,
    PartiallyAssigned,
    Assigned,
}

/// A job's service window: the UTC interval inside which it must start and
/// finish (the "SW" referenced throughout the engine).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ServiceWindow {
    pub fn is_ordered(&self) -> bool {
        self.start < self.end
    }

    pub fn width_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn contains_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.start && end <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub duration_minutes: u32,
    pub location: GeoPoint,
    /// IANA zone derived from the job's coordinates at ingest time.
    pub zone: String,
    pub required_skills: BTreeSet<String>,
    pub service_window: ServiceWindow,
    pub priority: JobPriority,
    pub status: JobStatus,
}

impl Job {
    /// §3 invariant: duration must not exceed the width of the service window.
    pub fn duration_fits_window(&self) -> bool {
        self.duration_minutes > 0
            && (self.duration_minutes as i64) <= self.service_window.width_minutes()
    }
}

/// Region used to derive event channels (`dispatch/{region}`). Pluggable per
/// §6; the default strategy takes the first administrative subdivision, but
/// since that requires a geocoder external to this core, the default
/// implementation here falls back to a coarse lat/lon grid cell label
/// (documented as a decision in DESIGN.md).
pub fn derive_region(point: &GeoPoint) -> String {
    let lat_cell = (point.lat * 4.0).round() as i64;
    let lon_cell = (point.lon * 4.0).round() as i64;
    format!("region-{lat_cell}-{lon_cell}")
}
