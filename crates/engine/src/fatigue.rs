//! C5 — Fatigue & per-day limits checker (§4.4).

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

use smartscheduler_domain::assignment::Assignment;
use smartscheduler_domain::contractor::Contractor;

/// Split an interval `[start, end)` into per-local-date `(date, minutes)`
/// pairs, so a job spanning midnight in the contractor's zone is accounted
/// against both days (§4.4: "jobs spanning midnight are split for
/// accounting").
fn minutes_per_local_date(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> Vec<(chrono::NaiveDate, i64)> {
    let mut out = Vec::new();
    let local_start = start.with_timezone(&tz);
    let local_end = end.with_timezone(&tz);

    if local_start.date_naive() == local_end.date_naive() {
        out.push((local_start.date_naive(), (end - start).num_minutes()));
        return out;
    }

    let mut cursor = start;
    loop {
        let local_cursor = cursor.with_timezone(&tz);
        let date = local_cursor.date_naive();
        let next_midnight_local = (date + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap();
        let next_midnight_utc = match tz.from_local_datetime(&next_midnight_local) {
            chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
            chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            chrono::LocalResult::None => cursor + Duration::minutes(1),
        };
        let segment_end = next_midnight_utc.min(end);
        out.push((date, (segment_end - cursor).num_minutes()));
        if segment_end >= end {
            break;
        }
        cursor = segment_end;
    }
    out
}

/// Returns `true` if scheduling `[candidate_start, candidate_end)` on
/// `contractor` would stay within the daily-hour and daily-job caps, given
/// their other non-cancelled assignments.
pub fn fits_fatigue_limits(
    contractor: &Contractor,
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    other_assignments: &[Assignment],
) -> bool {
    let tz: Tz = contractor.home_zone.parse().unwrap_or(Tz::UTC);

    let candidate_splits = minutes_per_local_date(candidate_start, candidate_end, tz);

    for (date, candidate_minutes) in &candidate_splits {
        let mut total_minutes = *candidate_minutes;
        let mut job_count: u32 = 1;

        for a in other_assignments {
            if !a.status.is_active() {
                continue;
            }
            for (a_date, a_minutes) in minutes_per_local_date(a.start_utc, a.end_utc, tz) {
                if a_date == *date {
                    total_minutes += a_minutes;
                }
            }
            let a_local_start = a.start_utc.with_timezone(&tz).date_naive();
            let a_local_end = a.end_utc.with_timezone(&tz).date_naive();
            if a_local_start == *date || a_local_end == *date {
                job_count += 1;
            }
        }

        if total_minutes > contractor.daily_hour_cap as i64 * 60 {
            return false;
        }
        if job_count > contractor.daily_job_cap {
            return false;
        }
    }

    true
}
