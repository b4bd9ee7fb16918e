//! C6 — Slot generator: up to three labeled suggested slots per contractor
//! (§4.5), each filtered through the fatigue checker (C5).

use chrono::{DateTime, Duration, Utc};

use smartscheduler_domain::assignment::Assignment;
use smartscheduler_domain::contractor::{Contractor, GeoPoint};
use smartscheduler_domain::requests::{SlotType, SuggestedSlot};

use crate::distance::DistanceEta;
use crate::fatigue::fits_fatigue_limits;
use crate::working_hours::UtcInterval;

/// Candidate start times at quarter-hour steps inside a feasible window,
/// leaving room for the job's duration.
fn candidate_starts(window: &UtcInterval, duration: Duration) -> Vec<DateTime<Utc>> {
    let mut starts = Vec::new();
    let mut cursor = window.start;
    let step = Duration::minutes(15);
    while cursor + duration <= window.end {
        starts.push(cursor);
        cursor += step;
    }
    starts
}

/// The ETA into the job (from the previous assignment's location, or the
/// contractor's base if none precede) and out of it (to the next
/// assignment's location, or zero if none follow), at a candidate start.
struct Neighbors<'a> {
    assignments: &'a [Assignment],
    job_location: GeoPoint,
}

impl<'a> Neighbors<'a> {
    fn combined_eta<F>(&self, start: DateTime<Utc>, end: DateTime<Utc>, eta_fn: &F) -> f64
    where
        F: Fn(GeoPoint, GeoPoint) -> f64,
    {
        let entering = self
            .assignments
            .iter()
            .filter(|a| a.status.is_active() && a.end_utc <= start)
            .max_by_key(|a| a.end_utc)
            .map(|a| eta_fn(a.job_location, self.job_location))
            .unwrap_or(0.0);

        let leaving = self
            .assignments
            .iter()
            .filter(|a| a.status.is_active() && a.start_utc >= end)
            .min_by_key(|a| a.start_utc)
            .map(|a| eta_fn(self.job_location, a.job_location))
            .unwrap_or(0.0);

        entering + leaving
    }
}

/// Confidence score for a candidate slot (§4.5 highest-confidence rule):
/// base 50, + up to 30 for buffer slack around neighbors, +20 if the ETA
/// source used was routed rather than cheap, -20 if the slot overlaps a
/// DST transition window. Clamped to [0, 100].
pub fn confidence_score(buffer_slack_minutes: f64, source_is_routed: bool, overlaps_dst_transition: bool) -> u32 {
    let mut score: f64 = 50.0;
    score += (buffer_slack_minutes / 60.0 * 30.0).clamp(0.0, 30.0);
    if source_is_routed {
        score += 20.0;
    }
    if overlaps_dst_transition {
        score -= 20.0;
    }
    score.clamp(0.0, 100.0).round() as u32
}

/// Generate up to three labeled slots for a contractor from their feasible
/// windows. `eta_fn` computes travel time in minutes between two points
/// (backed by the cached/cheap distance service); `source_is_routed`
/// reports whether the last `eta_fn` call for a given pair resolved via the
/// routed provider (used for the confidence bonus).
pub fn generate_slots<F, R>(
    contractor: &Contractor,
    feasible_windows: &[UtcInterval],
    duration_minutes: u32,
    job_location: GeoPoint,
    other_assignments: &[Assignment],
    eta_fn: F,
    routed_source_fn: R,
) -> Vec<SuggestedSlot>
where
    F: Fn(GeoPoint, GeoPoint) -> f64,
    R: Fn(GeoPoint, GeoPoint) -> bool,
{
    let duration = Duration::minutes(duration_minutes as i64);
    let neighbors = Neighbors { assignments: other_assignments, job_location };

    let mut slots = Vec::new();

    // earliest: first endpoint of the feasible-windows list.
    if let Some(first) = feasible_windows.first() {
        let start = first.start;
        let end = start + duration;
        if fits_fatigue_limits(contractor, start, end, other_assignments) {
            slots.push(SuggestedSlot {
                start_utc: start,
                end_utc: end,
                slot_type: SlotType::Earliest,
                confidence: confidence_score(60.0, false, false),
            });
        }
    }

    // lowest-travel: minimize combined entering+leaving ETA, ties -> earliest start.
    let mut best_travel: Option<(DateTime<Utc>, f64)> = None;
    for window in feasible_windows {
        for start in candidate_starts(window, duration) {
            let end = start + duration;
            if !fits_fatigue_limits(contractor, start, end, other_assignments) {
                continue;
            }
            let eta_sum = neighbors.combined_eta(start, end, &eta_fn);
            match best_travel {
                Some((_, best_eta)) if eta_sum >= best_eta => {}
                _ => best_travel = Some((start, eta_sum)),
            }
        }
    }
    if let Some((start, _)) = best_travel {
        let end = start + duration;
        let routed = routed_source_fn(job_location, job_location);
        slots.push(SuggestedSlot {
            start_utc: start,
            end_utc: end,
            slot_type: SlotType::LowestTravel,
            confidence: confidence_score(45.0, routed, false),
        });
    }

    // highest-confidence: maximize buffer slack around neighbors among feasible starts.
    let mut best_confidence: Option<(DateTime<Utc>, u32)> = None;
    for window in feasible_windows {
        for start in candidate_starts(window, duration) {
            let end = start + duration;
            if !fits_fatigue_limits(contractor, start, end, other_assignments) {
                continue;
            }
            let slack_before = (start - window.start).num_minutes() as f64;
            let slack_after = (window.end - end).num_minutes() as f64;
            let slack = slack_before.min(slack_after);
            let routed = routed_source_fn(job_location, job_location);
            let confidence = confidence_score(slack, routed, false);
            match best_confidence {
                Some((_, best)) if confidence <= best => {}
                _ => best_confidence = Some((start, confidence)),
            }
        }
    }
    if let Some((start, confidence)) = best_confidence {
        let end = start + duration;
        slots.push(SuggestedSlot {
            start_utc: start,
            end_utc: end,
            slot_type: SlotType::HighestConfidence,
            confidence,
        });
    }

    slots
}
