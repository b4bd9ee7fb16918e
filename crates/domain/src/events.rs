//! Domain events and the append-only event log entry (C10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stable event payloads emitted by C8/C9 (§6 "Events emitted").
/// Fields are additive-only across versions per the spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    RecommendationReady {
        request_id: Uuid,
        job_id: Uuid,
        config_version: u32,
    },
    JobAssigned {
        job_id: Uuid,
        contractor_id: Uuid,
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
        source: crate::assignment::AssignmentSource,
    },
    JobRescheduled {
        job_id: Uuid,
        old_start_utc: DateTime<Utc>,
        new_start_utc: DateTime<Utc>,
        contractor_id: Uuid,
    },
    JobCancelled {
        job_id: Uuid,
        reason: String,
    },
}

impl DomainEvent {
    /// Logical channels this event should be fanned out to (§6 "Channels").
    pub fn channels(&self, region: &str) -> Vec<String> {
        match self {
            DomainEvent::RecommendationReady { .. } => vec![format!("dispatch/{region}")],
            DomainEvent::JobAssigned { contractor_id, .. } => vec![
                format!("dispatch/{region}"),
                format!("contractor/{contractor_id}"),
            ],
            DomainEvent::JobRescheduled { contractor_id, .. } => vec![
                format!("dispatch/{region}"),
                format!("contractor/{contractor_id}"),
            ],
            DomainEvent::JobCancelled { .. } => vec![format!("dispatch/{region}")],
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::RecommendationReady { .. } => "RecommendationReady",
            DomainEvent::JobAssigned { .. } => "JobAssigned",
            DomainEvent::JobRescheduled { .. } => "JobRescheduled",
            DomainEvent::JobCancelled { .. } => "JobCancelled",
        }
    }
}

/// An append-only row in the event log, written before subscribers are
/// invoked (§4.9) so the publish operation can still report success even if
/// a subscriber callback fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
    pub channels: Vec<String>,
}
