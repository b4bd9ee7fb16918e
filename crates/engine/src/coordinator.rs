//! C8 — Recommendation coordinator: drives C2-C7 concurrently per request,
//! persists an audit, and emits `RecommendationReady` (§4.7).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio::task::JoinSet;
use uuid::Uuid;

use smartscheduler_domain::assignment::Assignment;
use smartscheduler_domain::audit::{AuditActor, AuditRecommendation, CandidateRecord};
use smartscheduler_domain::contractor::{Contractor, GeoPoint};
use smartscheduler_domain::errors::DomainError;
use smartscheduler_domain::events::DomainEvent;
use smartscheduler_domain::job::{derive_region, Job, ServiceWindow};
use smartscheduler_domain::requests::{RankedContractor, RecommendRequest, RecommendResponse};
use smartscheduler_domain::validation::contractor_has_required_skills;
use smartscheduler_domain::weights::WeightsConfig;

use crate::clock::{Clock, IdProvider};
use crate::distance::{haversine_minutes, DistanceEta, DistanceService};
use crate::event_sink::EventSink;
use crate::availability::feasible_windows;
use crate::ports::{AssignmentRepository, AuditRepository, ContractorRepository, JobRepository, WeightsConfigRepository};
use crate::scorer::{rank_candidates, score_candidate, RankableCandidate, ScoreInputs};
use crate::slots::generate_slots;
use crate::working_hours::resolve_open_intervals;

pub struct Coordinator {
    contractors: Arc<dyn ContractorRepository>,
    jobs: Arc<dyn JobRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    audits: Arc<dyn AuditRepository>,
    weights_repo: Arc<dyn WeightsConfigRepository>,
    distance: Arc<DistanceService>,
    event_sink: Arc<EventSink>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
}

impl Coordinator {
    pub fn new(
        contractors: Arc<dyn ContractorRepository>,
        jobs: Arc<dyn JobRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        audits: Arc<dyn AuditRepository>,
        weights_repo: Arc<dyn WeightsConfigRepository>,
        distance: Arc<DistanceService>,
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
            distance,
            event_sink,
            clock,
            ids,
        }
    }

    pub async fn recommend(&self, request: RecommendRequest) -> Result<RecommendResponse, DomainError> {
        let weights = self.weights_repo.active().await.map_err(|e| DomainError::Fatal(e.to_string()))?;
        let deadline = StdDuration::from_millis(weights.tunables.deadline_recommend_ms);

        match tokio::time::timeout(deadline, self.recommend_inner(request.clone(), &weights)).await {
            Ok(result) => result,
            Err(_) => {
                let request_id = self.ids.new_id();
                let audit = AuditRecommendation {
                    id: request_id,
                    job_id: request.job_id,
                    request_snapshot: serde_json::to_value(&TimeoutSnapshotView {
                        job_id: request.job_id,
                        requested_service_window: request.service_window,
                        max_results: request.max_results,
                    })
                    .unwrap_or(serde_json::Value::Null),
                    candidates: Vec::new(),
                    selected_contractor_id: None,
                    actor: AuditActor::System,
                    config_version: weights.version,
                    created_at: self.clock.now(),
                    degraded: true,
                };
                let _ = self.audits.insert(&audit).await;

                Ok(RecommendResponse {
                    request_id,
                    job_id: request.job_id,
                    recommendations: Vec::new(),
                    config_version: weights.version,
                    generated_at: self.clock.now(),
                    degraded: true,
                })
            }
        }
    }

    async fn recommend_inner(&self, request: RecommendRequest, weights: &WeightsConfig) -> Result<RecommendResponse, DomainError> {
        let request_id = self.ids.new_id();

        // Step 1: load job.
        let job = self
            .jobs
            .get(request.job_id)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .ok_or_else(|| DomainError::NotFound(format!("job {} not found", request.job_id)))?;

        let service_window = request.service_window.unwrap_or(job.service_window);
        let max_results = request.max_results.unwrap_or(weights.tunables.max_results_default);

        // Step 2: candidates whose skills are a superset of the job's required skills.
        let candidates = self
            .contractors
            .find_with_skills(&job.required_skills)
            .await
            .map_err(|e| DomainError::Fatal(e.to_string()))?
            .into_iter()
            .filter(|c| contractor_has_required_skills(c, &job))
            .collect::<Vec<_>>();

        let mut degraded = false;

        if candidates.is_empty() {
            let audit = AuditRecommendation {
                id: request_id,
                job_id: job.id,
                request_snapshot: serde_json::to_value(&SnapshotView { job_id: job.id, service_window, max_results })
                    .unwrap_or(serde_json::Value::Null),
                candidates: Vec::new(),
                selected_contractor_id: None,
                actor: AuditActor::System,
                config_version: weights.version,
                created_at: self.clock.now(),
                degraded: false,
            };
            self.audits.insert(&audit).await.map_err(|e| DomainError::Fatal(e.to_string()))?;
            return Ok(RecommendResponse {
                request_id,
                job_id: job.id,
                recommendations: Vec::new(),
                config_version: weights.version,
                generated_at: self.clock.now(),
                degraded: false,
            });
        }

        // Step 3: cheap matrix, drop beyond d_max.
        let destinations: Vec<GeoPoint> = candidates.iter().map(|c| c.base_location).collect();
        let cheap = self.distance.cheap_matrix(job.location, &destinations, weights.tunables.cheap_speed_kmh);

        let mut drop_records: Vec<CandidateRecord> = Vec::new();
        let mut surviving: Vec<(Contractor, DistanceEta)> = Vec::new();
        for (contractor, eta) in candidates.into_iter().zip(cheap.into_iter()) {
            if eta.dist_m <= weights.tunables.score_d_max_m {
                surviving.push((contractor, eta));
            } else {
                drop_records.push(CandidateRecord {
                    contractor_id: contractor.id,
                    score: None,
                    drop_reason: Some("beyond d_max".to_string()),
                });
            }
        }

        // Step 4: refine the top K candidates by cheap distance (ascending).
        surviving.sort_by(|a, b| a.1.dist_m.partial_cmp(&b.1.dist_m).unwrap_or(std::cmp::Ordering::Equal));
        let top_k = weights.tunables.top_k_for_routing.min(surviving.len());

        let mut eta_map: HashMap<Uuid, DistanceEta> = HashMap::new();
        for (contractor, eta) in &surviving {
            eta_map.insert(contractor.id, *eta);
        }

        if top_k > 0 {
            let top_destinations: Vec<GeoPoint> = surviving[..top_k].iter().map(|(c, _)| c.base_location).collect();
            let refined = self
                .distance
                .refined_matrix(job.location, &top_destinations, self.clock.now(), self.clock.now(), &weights.tunables)
                .await;
            for ((contractor, _), eta) in surviving[..top_k].iter().zip(refined.into_iter()) {
                if eta.source == smartscheduler_domain::distance_cache::DistanceSource::Haversine {
                    degraded = true;
                }
                eta_map.insert(contractor.id, eta);
            }
        }

        // Step 5: per-candidate feasibility/slots, concurrently.
        let mut join_set: JoinSet<CandidateResult> = JoinSet::new();
        let d1 = service_window.start.date_naive() - chrono::Duration::days(1);
        let d2 = service_window.end.date_naive() + chrono::Duration::days(1);

        for (contractor, _) in &surviving {
            let contractor = contractor.clone();
            let eta = *eta_map.get(&contractor.id).expect("eta computed for every surviving candidate");
            let job_location = job.location;
            let duration_minutes = job.duration_minutes;
            let assignments_repo = self.assignments.clone();
            let rotation_window_days = weights.tunables.rotation_window_days;
            let now = self.clock.now();
            let cheap_speed = weights.tunables.cheap_speed_kmh;
            let tunables = weights.tunables;

            join_set.spawn(async move {
                let since = now - chrono::Duration::days(rotation_window_days);
                let active = assignments_repo
                    .active_for_contractor_in_range(contractor.id, service_window.start, service_window.end)
                    .await
                    .unwrap_or_default();
                let recent_count = assignments_repo.count_recent_for_contractor(contractor.id, since).await.unwrap_or(0);

                let open = resolve_open_intervals(&contractor, d1, d2);
                let windows = feasible_windows(
                    &open,
                    service_window,
                    duration_minutes,
                    &active,
                    job_location,
                    |a, b| haversine_minutes(a, b, cheap_speed),
                    &tunables,
                );

                let slots = generate_slots(
                    &contractor,
                    &windows,
                    duration_minutes,
                    job_location,
                    &active,
                    |a, b| haversine_minutes(a, b, cheap_speed),
                    |_, _| eta.source == smartscheduler_domain::distance_cache::DistanceSource::Routed,
                );

                CandidateResult {
                    contractor,
                    eta,
                    windows,
                    slots,
                    active,
                    recent_count,
                }
            });
        }

        let mut per_candidate = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => per_candidate.push(result),
                Err(_) => degraded = true,
            }
        }

        // Step 6: score and rank.
        let horizon_min = service_window.width_minutes();
        let mut rankable = Vec::new();

        for result in per_candidate {
            let Some(first_window) = result.windows.first() else {
                drop_records.push(CandidateRecord {
                    contractor_id: result.contractor.id,
                    score: None,
                    drop_reason: Some("no feasible window".to_string()),
                });
                continue;
            };
            let minutes_until_earliest = (first_window.start - service_window.start).num_minutes().max(0);
            let breakdown = score_candidate(
                ScoreInputs {
                    minutes_until_earliest: Some(minutes_until_earliest),
                    horizon_min,
                    rating: result.contractor.rating,
                    distance_m: result.eta.dist_m,
                    assignments_last_window: result.recent_count,
                },
                weights,
                result.eta.eta_min,
                None,
            );

            rankable.push(RankableCandidate {
                contractor_id: result.contractor.id,
                rating: result.contractor.rating,
                eta_min: result.eta.eta_min,
                earliest_start: Some(first_window.start),
                breakdown,
                payload: (result.contractor, result.eta, result.slots),
            });
        }

        let ranked = rank_candidates(rankable);
        let truncated: Vec<_> = ranked.into_iter().take(max_results).collect();

        let recommendations: Vec<RankedContractor> = truncated
            .iter()
            .map(|r| {
                let (contractor, eta, slots) = &r.payload;
                RankedContractor {
                    contractor_id: contractor.id,
                    contractor_name: contractor.display_name.clone(),
                    score: r.breakdown.final_score,
                    score_breakdown: r.breakdown.clone(),
                    rationale: r.breakdown.rationale.clone(),
                    suggested_slots: slots.clone(),
                    distance_m: eta.dist_m,
                    eta_min: eta.eta_min,
                }
            })
            .collect();

        let mut audit_candidates: Vec<CandidateRecord> = truncated
            .iter()
            .map(|r| CandidateRecord {
                contractor_id: r.contractor_id,
                score: Some(r.breakdown.clone()),
                drop_reason: None,
            })
            .collect();
        audit_candidates.extend(drop_records);

        let audit = AuditRecommendation {
            id: request_id,
            job_id: job.id,
            request_snapshot: serde_json::to_value(&SnapshotView { job_id: job.id, service_window, max_results })
                .unwrap_or(serde_json::Value::Null),
            candidates: audit_candidates,
            selected_contractor_id: None,
            actor: AuditActor::System,
            config_version: weights.version,
            created_at: self.clock.now(),
            degraded,
        };
        self.audits.insert(&audit).await.map_err(|e| DomainError::Fatal(e.to_string()))?;

        // Step 8: emit RecommendationReady, happens-after the audit write above.
        let region = derive_region(&job.location);
        let event = DomainEvent::RecommendationReady {
            request_id,
            job_id: job.id,
            config_version: weights.version,
        };
        let _ = self.event_sink.publish(event, &region, Some(self.clock.now())).await;

        Ok(RecommendResponse {
            request_id,
            job_id: job.id,
            recommendations,
            config_version: weights.version,
            generated_at: self.clock.now(),
            degraded,
        })
    }
}

struct CandidateResult {
    contractor: Contractor,
    eta: DistanceEta,
    windows: Vec<crate::working_hours::UtcInterval>,
    slots: Vec<smartscheduler_domain::requests::SuggestedSlot>,
    active: Vec<Assignment>,
    recent_count: u32,
}

#[derive(serde::Serialize)]
struct SnapshotView {
    job_id: Uuid,
    service_window: ServiceWindow,
    max_results: usize,
}

#[derive(serde::Serialize)]
struct TimeoutSnapshotView {
    job_id: Uuid,
    requested_service_window: Option<ServiceWindow>,
    max_results: Option<usize>,
}
