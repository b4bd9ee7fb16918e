//! Literal-input scenario tests mirroring the seed scenarios documented
//! for the recommendation/booking pipeline: happy-path ranking, skill
//! exclusion, a booking conflict between two concurrent callers, routing
//! fallback, a DST forward jump, and rotation fairness.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use smartscheduler_domain::assignment::{Assignment, AssignmentSource, AssignmentStatus};
use smartscheduler_domain::contractor::{Contractor, GeoPoint, HoursInterval};
use smartscheduler_domain::job::{Job, JobPriority, JobStatus, ServiceWindow};
use smartscheduler_domain::requests::{AssignRequest, RecommendRequest};
use smartscheduler_domain::weights::WeightsConfig;
use smartscheduler_engine::clock::{FixedClock, UuidProvider};
use smartscheduler_engine::ports::{
    MockAssignmentRepository, MockAuditRepository, MockContractorRepository, MockEventLogRepository,
    MockJobRepository, MockWeightsConfigRepository,
};
use smartscheduler_engine::{AssignmentTransaction, Coordinator, DistanceCache, DistanceService, EventSink, FakeRoutingProvider};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn hours(start: &str, end: &str) -> Vec<HoursInterval> {
    vec![HoursInterval {
        start: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
        end: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
    }]
}

fn tile_job(location: GeoPoint, required_skills: BTreeSet<String>) -> Job {
    Job {
        id: Uuid::new_v4(),
        job_type: "tile".into(),
        duration_minutes: 120,
        location,
        zone: "America/New_York".into(),
        required_skills,
        service_window: ServiceWindow { start: utc(2025, 11, 12, 9, 0), end: utc(2025, 11, 12, 17, 0) },
        priority: JobPriority::Normal,
        status: JobStatus::Created,
    }
}

fn contractor(name: &str, base: GeoPoint, rating: u8, skills: &[&str]) -> Contractor {
    let mut c = Contractor::new_default(Uuid::new_v4(), name.into(), base, "America/New_York".into());
    c.rating = rating;
    c.daily_break_minutes = 0;
    for day in 0..7 {
        c.weekly_hours.days[day] = hours("09:00", "17:00");
    }
    c.skills = skills.iter().map(|s| s.to_string()).collect();
    c
}

fn coordinator_with(
    job: Job,
    contractors: Vec<Contractor>,
    weights: WeightsConfig,
    routing_fails: bool,
    now: chrono::DateTime<Utc>,
) -> Coordinator {
    let job_id = job.id;
    let mut job_repo = MockJobRepository::new();
    job_repo.expect_get().returning(move |id| if id == job_id { Ok(Some(job.clone())) } else { Ok(None) });

    let mut contractor_repo = MockContractorRepository::new();
    let found = contractors.clone();
    contractor_repo.expect_find_with_skills().returning(move |_| Ok(found.clone()));

    let mut assignment_repo = MockAssignmentRepository::new();
    assignment_repo.expect_active_for_contractor_in_range().returning(|_, _, _| Ok(Vec::new()));
    assignment_repo.expect_count_recent_for_contractor().returning(|_, _| Ok(0));

    let mut audit_repo = MockAuditRepository::new();
    audit_repo.expect_insert().returning(|_| Ok(()));

    let mut weights_repo = MockWeightsConfigRepository::new();
    weights_repo.expect_active().returning(move || Ok(weights.clone()));

    let mut event_repo = MockEventLogRepository::new();
    event_repo.expect_append().returning(|_| Ok(()));

    let clock = Arc::new(FixedClock(now));
    let ids = Arc::new(UuidProvider);
    let distance = Arc::new(DistanceService::new(
        Arc::new(DistanceCache::new()),
        Arc::new(FakeRoutingProvider { congestion_factor: 1.0, fail: routing_fails }),
    ));
    let event_sink = Arc::new(EventSink::new(Arc::new(event_repo), clock.clone(), ids.clone()));

    Coordinator::new(
        Arc::new(contractor_repo),
        Arc::new(job_repo),
        Arc::new(assignment_repo),
        Arc::new(audit_repo),
        Arc::new(weights_repo),
        distance,
        event_sink,
        clock,
        ids,
    )
}

#[tokio::test]
async fn happy_path_ranking_prefers_closer_contractor() {
    let job_location = GeoPoint { lat: 40.0, lon: -73.0 };
    let job = tile_job(job_location, BTreeSet::new());

    // A is ~10km out, B is ~40km out (roughly, at this latitude 0.1 deg lon
    // ~= 8.5km); both qualify on skills since the job requires none.
    let a = contractor("A", GeoPoint { lat: 40.0, lon: -73.1 }, 90, &["tile"]);
    let b = contractor("B", GeoPoint { lat: 40.0, lon: -73.4 }, 75, &["tile", "carpet"]);
    let (a_id, b_id) = (a.id, b.id);

    let coordinator = coordinator_with(
        job.clone(),
        vec![a, b],
        WeightsConfig::default_v1(),
        false,
        utc(2025, 11, 12, 8, 0),
    );

    let response = coordinator
        .recommend(RecommendRequest { job_id: job.id, desired_date: None, service_window: None, max_results: None })
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 2);
    assert_eq!(response.recommendations[0].contractor_id, a_id);
    assert!(response.recommendations.iter().any(|r| r.contractor_id == b_id));
}

#[tokio::test]
async fn required_skill_excludes_non_matching_contractor() {
    let job_location = GeoPoint { lat: 40.0, lon: -73.0 };
    let mut required = BTreeSet::new();
    required.insert("carpet".to_string());
    let job = tile_job(job_location, required);

    let a = contractor("A", GeoPoint { lat: 40.0, lon: -73.1 }, 90, &["tile"]);
    let b = contractor("B", GeoPoint { lat: 40.0, lon: -73.4 }, 75, &["tile", "carpet"]);
    let b_id = b.id;

    // find_with_skills already pushes the superset filter down in a real
    // repository; the in-memory fake here mimics that by only returning B.
    let coordinator = coordinator_with(
        job.clone(),
        vec![b],
        WeightsConfig::default_v1(),
        false,
        utc(2025, 11, 12, 8, 0),
    );
    let _ = a;

    let response = coordinator
        .recommend(RecommendRequest { job_id: job.id, desired_date: None, service_window: None, max_results: None })
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 1);
    assert_eq!(response.recommendations[0].contractor_id, b_id);
}

#[tokio::test]
async fn routing_provider_timeout_degrades_but_still_ranks() {
    let job_location = GeoPoint { lat: 40.0, lon: -73.0 };
    let job = tile_job(job_location, BTreeSet::new());
    let a = contractor("A", GeoPoint { lat: 40.0, lon: -73.1 }, 90, &["tile"]);
    let a_id = a.id;

    let coordinator = coordinator_with(
        job.clone(),
        vec![a],
        WeightsConfig::default_v1(),
        true,
        utc(2025, 11, 12, 8, 0),
    );

    let response = coordinator
        .recommend(RecommendRequest { job_id: job.id, desired_date: None, service_window: None, max_results: None })
        .await
        .unwrap();

    assert!(response.degraded);
    assert_eq!(response.recommendations.len(), 1);
    assert_eq!(response.recommendations[0].contractor_id, a_id);
}

#[tokio::test]
async fn dst_forward_jump_gap_is_never_offered_as_a_slot() {
    let mut c = Contractor::new_default(
        Uuid::new_v4(),
        "Night Owl".into(),
        GeoPoint { lat: 40.71, lon: -74.0 },
        "America/New_York".into(),
    );
    c.daily_break_minutes = 0;
    for day in 0..7 {
        c.weekly_hours.days[day] = hours("01:00", "09:00");
    }

    let d1 = chrono::NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
    let intervals = smartscheduler_engine::working_hours::resolve_open_intervals(&c, d1, d1);

    // 2025-03-09 is the US spring-forward date: 02:00-03:00 local never
    // happens, so the resolved UTC span must be strictly shorter than the
    // naive 8h wall-clock width a non-DST-aware resolver would produce, and
    // a feasible window may never imply a 2h slot starting at 01:30 local.
    assert_eq!(intervals.len(), 1);
    let width = intervals[0].end - intervals[0].start;
    assert!(width.num_minutes() < 8 * 60);
}

#[tokio::test]
async fn rotation_weight_breaks_tie_in_favor_of_less_recently_booked_contractor() {
    let job_location = GeoPoint { lat: 40.0, lon: -73.0 };
    let job = tile_job(job_location, BTreeSet::new());

    let a = contractor("A", GeoPoint { lat: 40.0, lon: -73.1 }, 80, &["tile"]);
    let b = contractor("B", GeoPoint { lat: 40.0, lon: -73.1 }, 80, &["tile"]);
    let (a_id, b_id) = (a.id, b.id);

    let job_id = job.id;
    let mut job_repo = MockJobRepository::new();
    job_repo.expect_get().returning(move |_| Ok(Some(job.clone())));

    let mut contractor_repo = MockContractorRepository::new();
    let pair = vec![a, b];
    contractor_repo.expect_find_with_skills().returning(move |_| Ok(pair.clone()));

    let mut assignment_repo = MockAssignmentRepository::new();
    assignment_repo.expect_active_for_contractor_in_range().returning(|_, _, _| Ok(Vec::new()));
    assignment_repo.expect_count_recent_for_contractor().returning(move |id, _| {
        Ok(if id == a_id { 14 } else { 2 })
    });

    let mut audit_repo = MockAuditRepository::new();
    audit_repo.expect_insert().returning(|_| Ok(()));

    let mut weights_repo = MockWeightsConfigRepository::new();
    weights_repo.expect_active().returning(|| Ok(WeightsConfig::default_v1()));

    let mut event_repo = MockEventLogRepository::new();
    event_repo.expect_append().returning(|_| Ok(()));

    let clock = Arc::new(FixedClock(utc(2025, 11, 12, 8, 0)));
    let ids = Arc::new(UuidProvider);
    let distance = Arc::new(DistanceService::new(
        Arc::new(DistanceCache::new()),
        Arc::new(FakeRoutingProvider::default()),
    ));
    let event_sink = Arc::new(EventSink::new(Arc::new(event_repo), clock.clone(), ids.clone()));

    let coordinator = Coordinator::new(
        Arc::new(contractor_repo),
        Arc::new(job_repo),
        Arc::new(assignment_repo),
        Arc::new(audit_repo),
        Arc::new(weights_repo),
        distance,
        event_sink,
        clock,
        ids,
    );

    let response = coordinator
        .recommend(RecommendRequest { job_id, desired_date: None, service_window: None, max_results: None })
        .await
        .unwrap();

    assert_eq!(response.recommendations[0].contractor_id, b_id);
    assert!(response.recommendations[0].score >= response.recommendations[1].score);
}

#[tokio::test]
async fn concurrent_assign_calls_on_the_same_interval_yield_exactly_one_success() {
    let job_location = GeoPoint { lat: 40.0, lon: -73.0 };
    let job = tile_job(job_location, BTreeSet::new());
    let job_id = job.id;
    let a = contractor("A", GeoPoint { lat: 40.0, lon: -73.1 }, 90, &["tile"]);
    let a_id = a.id;

    let mut job_repo = MockJobRepository::new();
    let job_clone = job.clone();
    job_repo.expect_get().returning(move |_| Ok(Some(job_clone.clone())));

    let mut contractor_repo = MockContractorRepository::new();
    let a_clone = a.clone();
    contractor_repo.expect_get().returning(move |_| Ok(Some(a_clone.clone())));

    // The first call observes no existing assignment; the second (racing)
    // call observes the first's write and is rejected by the re-validation
    // step inside the same contractor lock.
    let booked = Arc::new(std::sync::Mutex::new(false));
    let mut assignment_repo = MockAssignmentRepository::new();
    let booked_read = booked.clone();
    assignment_repo.expect_active_for_contractor_in_range().returning(move |_, _, _| {
        if *booked_read.lock().unwrap() {
            Ok(vec![Assignment {
                id: Uuid::new_v4(),
                job_id,
                contractor_id: a_id,
                start_utc: utc(2025, 11, 12, 9, 0),
                end_utc: utc(2025, 11, 12, 11, 0),
                source: AssignmentSource::Manual,
                audit_id: None,
                status: AssignmentStatus::Confirmed,
                job_location,
            }])
        } else {
            Ok(Vec::new())
        }
    });
    let booked_write = booked.clone();
    assignment_repo.expect_insert().returning(move |_| {
        *booked_write.lock().unwrap() = true;
        Ok(())
    });

    let mut audit_repo = MockAuditRepository::new();
    audit_repo.expect_latest_for_job().returning(|_| Ok(None));

    let mut weights_repo = MockWeightsConfigRepository::new();
    weights_repo.expect_active().returning(|| Ok(WeightsConfig::default_v1()));

    let mut event_repo = MockEventLogRepository::new();
    event_repo.expect_append().returning(|_| Ok(()));

    let clock = Arc::new(FixedClock(utc(2025, 11, 12, 8, 0)));
    let ids = Arc::new(UuidProvider);
    let event_sink = Arc::new(EventSink::new(Arc::new(event_repo), clock.clone(), ids.clone()));

    let tx = Arc::new(AssignmentTransaction::new(
        Arc::new(contractor_repo),
        Arc::new(job_repo),
        Arc::new(assignment_repo),
        Arc::new(audit_repo),
        Arc::new(weights_repo),
        event_sink,
        clock,
        ids,
    ));

    let request = AssignRequest {
        contractor_id: a_id,
        start_utc: utc(2025, 11, 12, 9, 0),
        end_utc: utc(2025, 11, 12, 11, 0),
        actor: None,
    };

    let first = tx.assign(job_id, request.clone()).await;
    let second = tx.assign(job_id, request).await;

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let failure = if first.is_err() { first } else { second };
    assert!(matches!(failure, Err(smartscheduler_domain::errors::DomainError::Conflict(_))));
}
