//! C9 — Assignment transaction: atomic booking under a per-contractor
//! exclusive lock, with re-validation and event emission (§4.8).
//!
//! The lock registry is a `dashmap::DashMap<Uuid, Arc<tokio::sync::Mutex<()>>>`
//! (§5's "keyed, sharded, in-process store"), the same choice C2 makes for
//! its distance cache rather than a single `Mutex`-guarded `HashMap`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use smartscheduler_domain::assignment::{Assignment, AssignmentSource, AssignmentStatus};
use smartscheduler_domain::errors::DomainError;
use smartscheduler_domain::events::DomainEvent;
use smartscheduler_domain::job::derive_region;
use smartscheduler_domain::requests::{AssignRequest, CancelRequest, RescheduleRequest};

use crate::availability::feasible_windows;
use crate::clock::{Clock, IdProvider};
use crate::distance::haversine_minutes;
use crate::event_sink::EventSink;
use crate::ports::{AssignmentRepository, AuditRepository, ContractorRepository, JobRepository, WeightsConfigRepository};
use crate::working_hours::resolve_open_intervals;

const INTERVAL_TOLERANCE_SECONDS: i64 = 60;

pub struct AssignmentTransaction {
    contractors: Arc<dyn ContractorRepository>,
    jobs: Arc<dyn JobRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    audits: Arc<dyn AuditRepository>,
    weights_repo: Arc<dyn WeightsConfigRepository>,
    event_sink: Arc<EventSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
    locks: DashMap<Uuid, Arc<AsyncMutex<()>>>,
}

impl AssignmentTransaction {
    pub fn new(
        contractors: Arc<dyn ContractorRepository>,
        jobs: Arc<dyn JobRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        audits: Arc<dyn AuditRepository>,
        weights_repo: Arc<dyn WeightsConfigRepository>,
        event_sink: Arc<EventSink>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            contractors,
            jobs,
            assignments,
            audits,
            weights_repo,
            event_sink,
            clock,
            ids,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, contractor_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.locks.entry(contractor_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    async fn with_contractor_lock<F, T>(&self, contractor_id: Uuid, lock_wait: StdDuration, f: F) -> Result<T, DomainError>
    where
        F: std::future::Future<Output = Result<T, DomainError>>,
    {
        let lock = self.lock_for(contractor_id);
        let guard = tokio::time::timeout(lock_wait, lock.lock())
            .await
            .map_err(|_| DomainError::Conflict("timed out waiting for contractor lock".to_string()))?;
        let result = f.await;
        drop(guard);
        result
    }

    /// `assign(jobId, contractorId, startUtc, endUtc, actor)` (§4.8).
    pub async fn assign(&self, job_id: Uuid, request: AssignRequest) -> Result<Assignment, DomainError> {
        let weights = self.weights_repo.active().await.map_err(|e| DomainError::Fatal(e.to_string()))?;
        let lock_wait = StdDuration::from_millis(weights.tunables.lock_wait_ms);
        self.with_contractor_lock(request.contractor_id, lock_wait, self.do_assign(job_id, request, &weights)).await
    }

    async fn do_assign(&self, job_id: Uuid, request: AssignRequest, weights: &smartscheduler_domain::weights::WeightsConfig) -> Result<Assignment, DomainError> {
        let job = self
            .jobs
            .get(job_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("job {job_id} not found")))?;

        let contractor = self
            .contractors
            .get(request.contractor_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("contractor {} not found", request.contractor_id)))?;

        let actual_duration = (request.end_utc - request.start_utc).num_minutes();
        if (actual_duration - job.duration_minutes as i64).abs() > 1 {
            return Err(DomainError::InvalidRequest("endUtc - startUtc must equal job.duration".to_string()));
        }
        let tolerance = Duration::seconds(INTERVAL_TOLERANCE_SECONDS);
        if request.start_utc + tolerance < job.service_window.start || request.end_utc - tolerance > job.service_window.end {
            return Err(DomainError::InvalidRequest("proposed interval falls outside the service window".to_string()));
        }

        let d1 = request.start_utc.date_naive() - Duration::days(1);
        let d2 = request.end_utc.date_naive() + Duration::days(1);
        let open = resolve_open_intervals(&contractor, d1, d2);
        let existing = self
            .assignments
            .active_for_contractor_in_range(contractor.id, request.start_utc, request.end_utc)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?;

        let windows = feasible_windows(
            &open,
            job.service_window,
            job.duration_minutes,
            &existing,
            job.location,
            |a, b| haversine_minutes(a, b, weights.tunables.cheap_speed_kmh),
            &weights.tunables,
        );

        let still_feasible = windows.iter().any(|w| w.start <= request.start_utc && w.end >= request.end_utc);
        if !still_feasible {
            return Err(DomainError::Conflict("proposed interval is no longer available".to_string()));
        }

        let latest_audit = self.audits.latest_for_job(job_id).await.map_err(|e| DomainError::Fatal(e.to_string()))?;
        let (source, audit_id) = match latest_audit {
            Some(audit) => (AssignmentSource::Auto, Some(audit.id)),
            None => (AssignmentSource::Manual, None),
        };

        let assignment = Assignment {
            id: self.ids.new_id(),
            job_id,
            contractor_id: contractor.id,
            start_utc: request.start_utc,
            end_utc: request.end_utc,
            source,
            audit_id,
            status: AssignmentStatus::Confirmed,
            job_location: job.location,
        };

        self.assignments.insert(&assignment).await.map_err(|e| DomainError::Fatal(e.to_string()))?;

        let region = derive_region(&job.location);
        let event = DomainEvent::JobAssigned {
            job_id,
            contractor_id: contractor.id,
            start_utc: assignment.start_utc,
            end_utc: assignment.end_utc,
            source: assignment.source,
        };
        let _ = self.event_sink.publish(event, &region, Some(self.clock.now())).await;

        Ok(assignment)
    }

    /// Reschedule: cancel + create under the same lock, emitting a single
    /// `JobRescheduled` (§4.8).
    pub async fn reschedule(&self, job_id: Uuid, assignment_id: Uuid, request: RescheduleRequest) -> Result<Assignment, DomainError> {
        let weights = self.weights_repo.active().await.map_err(|e| DomainError::Fatal(e.to_string()))?;
        let lock_wait = StdDuration::from_millis(weights.tunables.lock_wait_ms);
        self.with_contractor_lock(request.contractor_id, lock_wait, self.do_reschedule(job_id, assignment_id, request, &weights)).await
    }

    async fn do_reschedule(&self, job_id: Uuid, assignment_id: Uuid, request: RescheduleRequest, weights: &smartscheduler_domain::weights::WeightsConfig) -> Result<Assignment, DomainError> {
        let old = self
            .assignments
            .get(assignment_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("assignment {assignment_id} not found")))?;

        self.assignments.cancel(old.id).await.map_err(|e| DomainError::Fatal(e.to_string()))?;

        let assign_request = AssignRequest {
            contractor_id: request.contractor_id,
            start_utc: request.new_start_utc,
            end_utc: request.new_end_utc,
            actor: None,
        };
        let new_assignment = self.do_assign(job_id, assign_request, weights).await?;

        let job = self
            .jobs
            .get(job_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("job {job_id} not found")))?;
        let region = derive_region(&job.location);
        let event = DomainEvent::JobRescheduled {
            job_id,
            old_start_utc: old.start_utc,
            new_start_utc: new_assignment.start_utc,
            contractor_id: request.contractor_id,
        };
        let _ = self.event_sink.publish(event, &region, Some(self.clock.now())).await;

        Ok(new_assignment)
    }

    /// Cancel an assignment, emitting `JobCancelled` (§4.8 "analogous operations").
    pub async fn cancel(&self, job_id: Uuid, assignment_id: Uuid, request: CancelRequest) -> Result<(), DomainError> {
        let assignment = self
            .assignments
            .get(assignment_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("assignment {assignment_id} not found")))?;

        let weights = self.weights_repo.active().await.map_err(|e| DomainError::Fatal(e.to_string()))?;
        let lock_wait = StdDuration::from_millis(weights.tunables.lock_wait_ms);
        self.with_contractor_lock(assignment.contractor_id, lock_wait, self.do_cancel(job_id, assignment, request)).await
    }

    async fn do_cancel(&self, job_id: Uuid, assignment: Assignment, request: CancelRequest) -> Result<(), DomainError> {
        self.assignments.cancel(assignment.id).await.map_err(|e| DomainError::Fatal(e.to_string()))?;

        let job = self
            .jobs
            .get(job_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("job {job_id} not found")))?;
        let region = derive_region(&job.location);
        let event = DomainEvent::JobCancelled { job_id, reason: request.reason };
        let _ = self.event_sink.publish(event, &region, Some(self.clock.now())).await;

        Ok(())
    }
}
