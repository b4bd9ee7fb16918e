//! Contractor entity and supporting value types.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A single weekday's working-hours interval, in the contractor's local time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HoursInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// The seven weekday slots, Monday first, matching `chrono::Weekday::num_days_from_monday`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WeeklyHours {
    pub days: [Vec<HoursInterval>; 7],
}

impl WeeklyHours {
    pub fn for_weekday(&self, weekday: chrono::Weekday) -> &[HoursInterval] {
        &self.days[weekday.num_days_from_monday() as usize]
    }
}

/// The kind of calendar exception recorded for a contractor on a given date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CalendarException {
    /// No work at all on this date.
    Holiday,
    /// Work according to an alternate weekly-hours shape and (optionally) zone.
    Override {
        hours: Vec<HoursInterval>,
        zone: Option<String>,
    },
}

/// A contractor's calendar: dated exceptions to their weekly hours.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Calendar {
    pub exceptions: std::collections::BTreeMap<NaiveDate, CalendarException>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contractor {
    pub id: Uuid,
    pub display_name: String,
    pub base_location: GeoPoint,
    /// IANA timezone identifier, e.g. "America/New_York".
    pub home_zone: String,
    /// 0-100, default 50 for a contractor with no completed jobs yet.
    pub rating: u8,
    pub weekly_hours: WeeklyHours,
    pub skills: BTreeSet<String>,
    pub calendar: Calendar,
    pub daily_break_minutes: u32,
    pub daily_hour_cap: u32,
    pub daily_job_cap: u32,
}

impl Contractor {
    pub fn new_default(id: Uuid, display_name: String, base_location: GeoPoint, home_zone: String) -> Self {
        Self {
            id,
            display_name,
            base_location,
            home_zone,
            rating: 50,
            weekly_hours: WeeklyHours::default(),
            skills: BTreeSet::new(),
            calendar: Calendar::default(),
            daily_break_minutes: 30,
            daily_hour_cap: 10,
            daily_job_cap: 4,
        }
    }

    /// True if every weekday's intervals are sorted and non-overlapping.
    pub fn has_non_overlapping_weekly_hours(&self) -> bool {
        self.weekly_hours.days.iter().all(|day| {
            let mut sorted = day.clone();
            sorted.sort_by_key(|i| i.start);
            sorted.windows(2).all(|w| w[0].end <= w[1].start)
        })
    }
}

/// Minimal projection of a contractor used by components that only need
/// identity and rotation bookkeeping (keeps engine code decoupled from the
/// full entity when scoring historical counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractorSnapshot {
    pub id: Uuid,
    pub display_name: String,
    pub rating: u8,
    pub base_location: GeoPoint,
}

impl From<&Contractor> for ContractorSnapshot {
    fn from(c: &Contractor) -> Self {
        Self {
            id: c.id,
            display_name: c.display_name.clone(),
            rating: c.rating,
            base_location: c.base_location,
        }
    }
}

/// Timestamped bound used by `dashmap`-backed caches keyed on contractor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RotationCount {
    pub contractor_id: Uuid,
    pub count_last_window: u32,
    pub as_of: DateTime<Utc>,
}
