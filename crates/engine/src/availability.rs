//! C4 — Availability engine: subtract existing assignments and travel
//! buffers from working hours, intersected with the job's service window
//! (§4.3). Interval-arithmetic shape grounded on `other_examples`'s
//! `availability-engine.rs` (`merge_intervals`/gap-finding), generalized
//! here to honor the quarter-hour quantization and buffer derivation rules
//! this spec adds.

use chrono::{DateTime, Duration, Timelike, Utc};

use smartscheduler_domain::assignment::{Assignment, AssignmentStatus};
use smartscheduler_domain::contractor::GeoPoint;
use smartscheduler_domain::job::ServiceWindow;
use smartscheduler_domain::weights::Tunables;

use crate::working_hours::UtcInterval;

/// Round a UTC instant up to the nearest quarter-hour.
fn round_up_quarter(t: DateTime<Utc>) -> DateTime<Utc> {
    let minute = t.minute() as i64;
    let remainder = minute % 15;
    if remainder == 0 && t.second() == 0 && t.nanosecond() == 0 {
        return t;
    }
    let add = 15 - remainder;
    (t + Duration::minutes(add))
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap()
}

/// Round a UTC instant down to the nearest quarter-hour.
fn round_down_quarter(t: DateTime<Utc>) -> DateTime<Utc> {
    let minute = t.minute() as i64;
    let remainder = minute % 15;
    (t - Duration::minutes(remainder))
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap()
}

fn clip(intervals: &[UtcInterval], window: ServiceWindow) -> Vec<UtcInterval> {
    intervals
        .iter()
        .filter_map(|i| {
            let start = i.start.max(window.start);
            let end = i.end.min(window.end);
            if start < end { Some(UtcInterval { start, end }) } else { None }
        })
        .collect()
}

/// Merge overlapping/adjacent intervals, assuming the input is sorted by start.
fn merge(mut intervals: Vec<UtcInterval>) -> Vec<UtcInterval> {
    intervals.sort_by_key(|i| i.start);
    let mut merged: Vec<UtcInterval> = Vec::new();
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Subtract `occupied` (merged, sorted) from `open` (any order), yielding
/// the free sub-intervals.
fn subtract(open: &[UtcInterval], occupied: &[UtcInterval]) -> Vec<UtcInterval> {
    let mut out = Vec::new();
    for window in open {
        let mut cursor = window.start;
        for block in occupied {
            if block.end <= cursor || block.start >= window.end {
                continue;
            }
            if block.start > cursor {
                out.push(UtcInterval { start: cursor, end: block.start.min(window.end) });
            }
            cursor = cursor.max(block.end);
            if cursor >= window.end {
                break;
            }
        }
        if cursor < window.end {
            out.push(UtcInterval { start: cursor, end: window.end });
        }
    }
    out
}

/// Derive the travel buffer around an assignment (§4.3 step 3):
/// `max(min_buffer, eta_min + fixed_padding)`.
pub fn travel_buffer_minutes(eta_min: f64, tunables: &Tunables) -> i64 {
    let derived = eta_min.ceil() as i64 + tunables.buffer_padding_minutes;
    derived.max(tunables.buffer_min_minutes)
}

/// Compute the feasible windows for a contractor given their open intervals,
/// the job's service window and duration, and their existing assignments.
///
/// `eta_minutes` is called once per overlapping assignment with the
/// assignment's job location and the candidate job's location, and should
/// be a cheap/cached lookup (the coordinator supplies one backed by C2).
pub fn feasible_windows<F>(
    open_intervals: &[UtcInterval],
    service_window: ServiceWindow,
    duration_minutes: u32,
    assignments: &[Assignment],
    job_location: GeoPoint,
    eta_minutes: F,
    tunables: &Tunables,
) -> Vec<UtcInterval>
where
    F: Fn(GeoPoint, GeoPoint) -> f64,
{
    let clipped = clip(open_intervals, service_window);

    let expanded: Vec<UtcInterval> = assignments
        .iter()
        .filter(|a| a.status.is_active() && a.overlaps(service_window.start, service_window.end))
        .map(|a| {
            let eta = eta_minutes(a.job_location, job_location);
            let buffer = Duration::minutes(travel_buffer_minutes(eta, tunables));
            UtcInterval {
                start: a.start_utc - buffer,
                end: a.end_utc + buffer,
            }
        })
        .collect();
    let occupied = merge(expanded);

    let free = subtract(&clipped, &occupied);
    let duration = Duration::minutes(duration_minutes as i64);

    let quantized: Vec<UtcInterval> = free
        .into_iter()
        .filter(|i| i.end - i.start >= duration)
        .filter_map(|i| {
            let start = round_up_quarter(i.start);
            let end = round_down_quarter(i.end);
            if end - start >= duration { Some(UtcInterval { start, end }) } else { None }
        })
        .collect();

    let mut result = merge(quantized);
    result.sort_by_key(|i| i.start);
    result
}
