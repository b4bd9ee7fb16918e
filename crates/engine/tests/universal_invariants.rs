//! Property-based checks for invariants that must hold across every input,
//! not just the literal seed scenarios: deterministic scoring, bounded
//! scores, the tie-break ordering chain, and feasible-window containment.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use smartscheduler_domain::assignment::{Assignment, AssignmentSource, AssignmentStatus};
use smartscheduler_domain::contractor::GeoPoint;
use smartscheduler_domain::job::ServiceWindow;
use smartscheduler_domain::weights::{Tunables, WeightsConfig};
use smartscheduler_engine::availability::{feasible_windows, travel_buffer_minutes};
use smartscheduler_engine::scorer::{rank_candidates, score_candidate, RankableCandidate, ScoreInputs};
use smartscheduler_engine::working_hours::UtcInterval;

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn inputs(minutes_until_earliest: i64, horizon_min: i64, rating: u8, distance_m: f64, assignments_last_window: u32) -> ScoreInputs {
    ScoreInputs {
        minutes_until_earliest: Some(minutes_until_earliest),
        horizon_min,
        rating,
        distance_m,
        assignments_last_window,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn final_score_is_deterministic_for_identical_inputs(
        minutes in 0i64..600,
        horizon in 60i64..1440,
        rating in 0u8..=100,
        distance_m in 0.0f64..150_000.0,
        recent in 0u32..30,
        eta_min in 0.0f64..120.0,
    ) {
        let weights = WeightsConfig::default_v1();
        let a = score_candidate(inputs(minutes, horizon, rating, distance_m, recent), &weights, eta_min, None);
        let b = score_candidate(inputs(minutes, horizon, rating, distance_m, recent), &weights, eta_min, None);
        prop_assert_eq!(a.final_score, b.final_score);
        prop_assert_eq!(a.rationale, b.rationale);
    }

    #[test]
    fn final_score_never_exceeds_the_0_to_100_range(
        minutes in 0i64..600,
        horizon in 60i64..1440,
        rating in 0u8..=100,
        distance_m in 0.0f64..150_000.0,
        recent in 0u32..30,
        eta_min in 0.0f64..120.0,
    ) {
        let weights = WeightsConfig::default_v1();
        let breakdown = score_candidate(inputs(minutes, horizon, rating, distance_m, recent), &weights, eta_min, None);
        prop_assert!(breakdown.final_score <= 100);
        prop_assert!(breakdown.rationale.len() <= 200);
    }

    /// §4.6's ordered tie-break chain: rating desc, then ETA asc, then
    /// earliest-start asc, then contractor id asc, applied only once
    /// `final_score` itself ties.
    #[test]
    fn rank_candidates_orders_by_rating_when_final_score_ties(
        rating_a in 0u8..=99,
        eta_a in 0.0f64..60.0,
        eta_b in 0.0f64..60.0,
    ) {
        let rating_b = rating_a + 1;
        let make = |id: u128, rating: u8, eta: f64| RankableCandidate {
            contractor_id: Uuid::from_u128(id),
            rating,
            eta_min: eta,
            earliest_start: None,
            breakdown: smartscheduler_domain::audit::ScoreBreakdown {
                availability: 50,
                rating: rating as u32,
                distance: 50,
                rotation: 50,
                final_score: 50,
                rationale: "x".into(),
            },
            payload: (),
        };
        let a = make(1, rating_a, eta_a);
        let b = make(2, rating_b, eta_b);
        let ranked = rank_candidates(vec![a, b]);
        prop_assert_eq!(ranked[0].contractor_id, Uuid::from_u128(2));
    }

    /// Every feasible window returned must lie inside the service window
    /// that bounded the query.
    #[test]
    fn feasible_windows_stay_inside_the_service_window(
        open_start_min in 0i64..120,
        open_len_min in 60i64..600,
        duration_min in 15u32..180,
    ) {
        let sw_start = utc(2025, 6, 2, 8, 0);
        let sw_end = utc(2025, 6, 2, 20, 0);
        let sw = ServiceWindow { start: sw_start, end: sw_end };

        let open_start = sw_start + ChronoDuration::minutes(open_start_min);
        let open_end = open_start + ChronoDuration::minutes(open_len_min);
        let open = vec![UtcInterval { start: open_start, end: open_end }];

        let windows = feasible_windows(
            &open,
            sw,
            duration_min,
            &[],
            GeoPoint { lat: 0.0, lon: 0.0 },
            |_, _| 0.0,
            &Tunables::default(),
        );

        for w in &windows {
            prop_assert!(w.start >= sw_start);
            prop_assert!(w.end <= sw_end);
            prop_assert!(w.end - w.start >= ChronoDuration::minutes(duration_min as i64));
        }
    }

    /// A feasible window must never overlap an active assignment once the
    /// travel buffer around it is taken into account.
    #[test]
    fn feasible_windows_never_overlap_a_buffered_assignment(
        assignment_offset_min in 0i64..360,
        assignment_len_min in 30i64..180,
        eta_min in 0.0f64..90.0,
    ) {
        let day_start = utc(2025, 6, 2, 0, 0);
        let day_end = utc(2025, 6, 3, 0, 0);
        let sw = ServiceWindow { start: day_start, end: day_end };
        let open = vec![UtcInterval { start: day_start, end: day_end }];

        let loc = GeoPoint { lat: 0.0, lon: 0.0 };
        let a_start = day_start + ChronoDuration::minutes(assignment_offset_min);
        let a_end = a_start + ChronoDuration::minutes(assignment_len_min);
        let assignments = vec![Assignment {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            contractor_id: Uuid::new_v4(),
            start_utc: a_start,
            end_utc: a_end,
            source: AssignmentSource::Auto,
            audit_id: None,
            status: AssignmentStatus::Confirmed,
            job_location: loc,
        }];

        let tunables = Tunables::default();
        let buffer = ChronoDuration::minutes(travel_buffer_minutes(eta_min, &tunables));
        let blocked_start = a_start - buffer;
        let blocked_end = a_end + buffer;

        let windows = feasible_windows(&open, sw, 30, &assignments, loc, move |_, _| eta_min, &tunables);

        for w in &windows {
            prop_assert!(w.end <= blocked_start || w.start >= blocked_end);
        }
    }
}

#[test]
fn already_delivered_event_id_check_is_idempotent_by_construction() {
    // Repository-level idempotence (`already_delivered`) is enforced by the
    // storage layer's primary key on `event_log.id`; this test documents the
    // invariant at the domain-type level: two entries built from the same id
    // carry identical content, so a replayed delivery is a true no-op.
    use smartscheduler_domain::events::{DomainEvent, EventLogEntry};

    let id = Uuid::new_v4();
    let event = DomainEvent::JobAssigned {
        job_id: Uuid::new_v4(),
        contractor_id: Uuid::new_v4(),
        start_utc: utc(2025, 6, 2, 9, 0),
        end_utc: utc(2025, 6, 2, 11, 0),
        source: AssignmentSource::Auto,
    };
    let now = utc(2025, 6, 2, 12, 0);
    let region = "region-160--292";

    let make_entry = || EventLogEntry {
        id,
        event_type: event.event_type().to_string(),
        payload: serde_json::to_value(&event).unwrap(),
        channels: event.channels(region),
        published_at: now,
    };

    let first = make_entry();
    let second = make_entry();
    assert_eq!(first.id, second.id);
    assert_eq!(first.payload, second.payload);
    assert_eq!(first.channels, second.channels);
}
