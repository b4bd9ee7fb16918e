//! Distance/ETA cache entry types (C2, §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Haversine,
    Routed,
}

/// Key quantizes coordinates to a cell grid and time to an hour-of-week
/// bucket (§4.1 "Caching policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistanceCacheKey {
    pub origin_cell: (i64, i64),
    pub destination_cell: (i64, i64),
    pub hour_of_week: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceCacheEntry {
    pub dist_m: f64,
    pub eta_min: f64,
    pub observed_at: DateTime<Utc>,
    pub source: DistanceSource,
}

impl DistanceCacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>, routed_ttl_s: i64, haversine_ttl_s: Option<i64>) -> bool {
        let ttl_s = match self.source {
            DistanceSource::Routed => Some(routed_ttl_s),
            DistanceSource::Haversine => haversine_ttl_s,
        };
        match ttl_s {
            None => false,
            Some(ttl) => (now - self.observed_at).num_seconds() > ttl,
        }
    }
}
