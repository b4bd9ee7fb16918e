//! C3 — Working-hours resolver: weekly hours + calendar exceptions → per-day
//! zone-aware UTC intervals (§4.2). Timezone handling grounded in
//! `other_examples`'s `availability-engine.rs`, which resolves
//! `timezone.parse::<chrono_tz::Tz>()` the same way.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use smartscheduler_domain::contractor::{CalendarException, Contractor, HoursInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Resolve the zone-aware open intervals for a contractor over the
/// inclusive date range `[d1, d2]`.
///
/// Precedence, in order (§4.2): holiday exception emits nothing; override
/// exception uses its own shape (and zone, if supplied); otherwise the
/// weekly-hours entry for that weekday. Breaks are subtracted symmetrically
/// around the interval midpoint, then converted to UTC.
pub fn resolve_open_intervals(contractor: &Contractor, d1: NaiveDate, d2: NaiveDate) -> Vec<UtcInterval> {
    let home_tz: Tz = contractor.home_zone.parse().unwrap_or(Tz::UTC);
    let mut out = Vec::new();

    let mut date = d1;
    while date <= d2 {
        let (intervals, zone_override): (Vec<HoursInterval>, Option<Tz>) =
            match contractor.calendar.exceptions.get(&date) {
                Some(CalendarException::Holiday) => {
                    date = date.succ_opt().unwrap_or(date);
                    continue;
                }
                Some(CalendarException::Override { hours, zone }) => {
                    let z = zone.as_ref().and_then(|s| s.parse::<Tz>().ok());
                    (hours.clone(), z)
                }
                None => (contractor.weekly_hours.for_weekday(date.weekday()).to_vec(), None),
            };

        let day_tz = zone_override.unwrap_or(home_tz);

        for interval in intervals {
            for (local_start, local_end) in subtract_break(interval, contractor.daily_break_minutes) {
                if let Some(utc_interval) = local_to_utc(date, local_start, local_end, day_tz) {
                    out.push(utc_interval);
                }
            }
        }

        date = date.succ_opt().unwrap_or(date);
    }

    out.sort_by_key(|i| i.start);
    out
}

/// Subtract the configured daily break, symmetric around the interval
/// midpoint (§4.2 rule 4). Returns zero, one, or two local sub-intervals:
/// two when the break falls strictly inside, zero if the break consumes the
/// whole interval, one unchanged if there is no break.
fn subtract_break(interval: HoursInterval, break_minutes: u32) -> Vec<(NaiveTime, NaiveTime)> {
    if break_minutes == 0 {
        return vec![(interval.start, interval.end)];
    }
    let total = interval.end - interval.start;
    let break_dur = Duration::minutes(break_minutes as i64);
    if break_dur >= total {
        return Vec::new();
    }
    let midpoint = interval.start + total / 2;
    let half = break_dur / 2;
    let break_start = midpoint - half;
    let break_end = midpoint + (break_dur - half);

    let mut out = Vec::new();
    if break_start > interval.start {
        out.push((interval.start, break_start));
    }
    if interval.end > break_end {
        out.push((break_end, interval.end));
    }
    out
}

/// Convert a local `[start, end)` on `date` in `tz` to a UTC interval.
///
/// DST ambiguity handling (§4.2): a forward-shift gap (the local time never
/// occurs) is skipped silently by dropping that endpoint's side of the
/// interval; a fall-back overlap (the local time occurs twice) resolves to
/// the earlier UTC instant via the `Ambiguous` arm's first value.
fn local_to_utc(date: NaiveDate, start: NaiveTime, end: NaiveTime, tz: Tz) -> Option<UtcInterval> {
    let start_local = date.and_time(start);
    let end_local = date.and_time(end);

    let start_utc = resolve_ambiguous(tz, start_local)?;
    let end_utc = resolve_ambiguous(tz, end_local)?;

    if end_utc <= start_utc {
        return None;
    }
    Some(UtcInterval { start: start_utc, end: end_utc })
}

fn resolve_ambiguous(tz: Tz, naive: chrono::NaiveDateTime) -> Option<DateTime<Utc>> {
    use chrono::LocalResult;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _latest) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
