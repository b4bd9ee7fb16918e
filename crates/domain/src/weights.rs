//! Scoring weights configuration (§3 WeightsConfig, §6 tunables).

use serde::{Deserialize, Serialize};

/// A monotonically increasing, immutable-once-referenced scoring configuration.
///
/// Once `version` is stamped onto any `AuditRecommendation`, storage must
/// refuse further mutation of that row (enforced in
/// `smartscheduler-storage`, not here — this type only carries the values).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightsConfig {
    pub version: u32,
    pub w_availability: f64,
    pub w_rating: f64,
    pub w_distance: f64,
    pub w_rotation: f64,
    pub tunables: Tunables,
}

/// Non-negative scoring/behavior tunables, §6's configuration table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Tunables {
    pub deadline_recommend_ms: u64,
    pub deadline_routing_ms: u64,
    pub lock_wait_ms: u64,
    pub buffer_min_minutes: i64,
    pub buffer_padding_minutes: i64,
    pub fatigue_daily_hours: u32,
    pub fatigue_daily_jobs: u32,
    pub score_d_max_m: f64,
    pub score_horizon_floor_min: i64,
    pub rotation_window_days: i64,
    pub rotation_cap: u32,
    pub cache_cell_m: f64,
    pub cache_routed_ttl_s: i64,
    pub cache_haversine_ttl_s: Option<i64>,
    pub cache_negative_ttl_s: i64,
    pub cheap_speed_kmh: f64,
    pub top_k_for_routing: usize,
    pub max_results_default: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            deadline_recommend_ms: 500,
            deadline_routing_ms: 1500,
            lock_wait_ms: 750,
            buffer_min_minutes: 15,
            buffer_padding_minutes: 5,
            fatigue_daily_hours: 10,
            fatigue_daily_jobs: 4,
            score_d_max_m: 80_000.0,
            score_horizon_floor_min: 60,
            rotation_window_days: 14,
            rotation_cap: 20,
            cache_cell_m: 250.0,
            cache_routed_ttl_s: 86_400,
            cache_haversine_ttl_s: None,
            cache_negative_ttl_s: 60,
            cheap_speed_kmh: 50.0,
            top_k_for_routing: 8,
            max_results_default: 10,
        }
    }
}

impl WeightsConfig {
    pub fn weight_sum(&self) -> f64 {
        self.w_availability + self.w_rating + self.w_distance + self.w_rotation
    }

    pub fn is_valid(&self) -> bool {
        self.w_availability >= 0.0
            && self.w_rating >= 0.0
            && self.w_distance >= 0.0
            && self.w_rotation >= 0.0
            && self.weight_sum() > 0.0
    }

    /// The default weights used in the spec's seed scenarios: 0.3/0.3/0.3/0.1.
    pub fn default_v1() -> Self {
        Self {
            version: 1,
            w_availability: 0.3,
            w_rating: 0.3,
            w_distance: 0.3,
            w_rotation: 0.1,
            tunables: Tunables::default(),
        }
    }
}
