//! C2 — Distance & ETA service: coarse Haversine + refined routed ETA with
//! cache and fallback (§4.1).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use smartscheduler_domain::{
    contractor::GeoPoint, distance_cache::{DistanceCacheEntry, DistanceCacheKey, DistanceSource},
    weights::Tunables,
};

#[derive(Debug, Clone, Copy)]
pub struct DistanceEta {
    pub dist_m: f64,
    pub eta_min: f64,
    pub source: DistanceSource,
}

/// The external routing provider, named but left untyped by the spec. A
/// real implementation would call out over HTTP; tests use `FakeRoutingProvider`.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route_batch(
        &self,
        origin: GeoPoint,
        destinations: &[GeoPoint],
    ) -> anyhow::Result<Vec<DistanceEta>>;
}

/// Deterministic in-memory routing fake for tests: routed ETA is the cheap
/// Haversine ETA scaled by a fixed congestion factor.
pub struct FakeRoutingProvider {
    pub congestion_factor: f64,
    pub fail: bool,
}

impl Default for FakeRoutingProvider {
    fn default() -> Self {
        Self {
            congestion_factor: 1.2,
            fail: false,
        }
    }
}

#[async_trait]
impl RoutingProvider for FakeRoutingProvider {
    async fn route_batch(
        &self,
        origin: GeoPoint,
        destinations: &[GeoPoint],
    ) -> anyhow::Result<Vec<DistanceEta>> {
        if self.fail {
            anyhow::bail!("routing provider unavailable");
        }
        Ok(destinations
            .iter()
            .map(|dest| {
                let cheap = haversine(origin, *dest, 50.0);
                DistanceEta {
                    dist_m: cheap.dist_m,
                    eta_min: cheap.eta_min * self.congestion_factor,
                    source: DistanceSource::Routed,
                }
            })
            .collect())
    }
}

/// Great-circle distance in meters (haversine formula).
fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Public haversine ETA helper used by C4/C6 for travel buffers between
/// assignment locations, where a routed lookup would be disproportionately
/// expensive for a quantity that only gates a buffer width.
pub fn haversine_minutes(a: GeoPoint, b: GeoPoint, speed_kmh: f64) -> f64 {
    haversine(a, b, speed_kmh).eta_min
}

fn haversine(origin: GeoPoint, dest: GeoPoint, speed_kmh: f64) -> DistanceEta {
    let dist_m = haversine_meters(origin, dest);
    let eta_min = (dist_m / 1000.0) / speed_kmh * 60.0;
    DistanceEta {
        dist_m,
        eta_min,
        source: DistanceSource::Haversine,
    }
}

fn quantize_cell(point: GeoPoint, cell_m: f64) -> (i64, i64) {
    // One degree of latitude is ~111_320 m; longitude scales with cos(lat).
    let lat_m_per_deg = 111_320.0;
    let lon_m_per_deg = 111_320.0 * point.lat.to_radians().cos().max(0.01);
    let lat_cell = ((point.lat * lat_m_per_deg) / cell_m).floor() as i64;
    let lon_cell = ((point.lon * lon_m_per_deg) / cell_m).floor() as i64;
    (lat_cell, lon_cell)
}

fn hour_of_week(at: DateTime<Utc>) -> u8 {
    use chrono::{Datelike, Timelike};
    let weekday = at.weekday().num_days_from_monday() as u32;
    (weekday * 24 + at.hour()) as u8
}

/// Sharded, TTL-aware distance/ETA cache backed by `dashmap`, mirroring the
/// teacher's use of `dashmap` for `PackCacheActor`'s backing store (the
/// teacher's `api` crate already depends on it).
#[derive(Default)]
pub struct DistanceCache {
    entries: DashMap<DistanceCacheKey, DistanceCacheEntry>,
    negative: DashMap<DistanceCacheKey, DateTime<Utc>>,
}

impl DistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn key(origin: GeoPoint, dest: GeoPoint, at: DateTime<Utc>, cell_m: f64) -> DistanceCacheKey {
        DistanceCacheKey {
            origin_cell: quantize_cell(origin, cell_m),
            destination_cell: quantize_cell(dest, cell_m),
            hour_of_week: hour_of_week(at),
        }
    }

    pub fn get(
        &self,
        origin: GeoPoint,
        dest: GeoPoint,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
        tunables: &Tunables,
    ) -> Option<DistanceEta> {
        let key = Self::key(origin, dest, at, tunables.cache_cell_m);
        let entry = self.entries.get(&key)?;
        if entry.is_expired(now, tunables.cache_routed_ttl_s, tunables.cache_haversine_ttl_s) {
            return None;
        }
        Some(DistanceEta {
            dist_m: entry.dist_m,
            eta_min: entry.eta_min,
            source: entry.source,
        })
    }

    pub fn put(&self, origin: GeoPoint, dest: GeoPoint, at: DateTime<Utc>, cell_m: f64, value: DistanceEta, observed_at: DateTime<Utc>) {
        let key = Self::key(origin, dest, at, cell_m);
        self.entries.insert(
            key,
            DistanceCacheEntry {
                dist_m: value.dist_m,
                eta_min: value.eta_min,
                observed_at,
                source: value.source,
            },
        );
    }

    fn is_negative_cached(&self, origin: GeoPoint, dest: GeoPoint, at: DateTime<Utc>, now: DateTime<Utc>, tunables: &Tunables) -> bool {
        let key = Self::key(origin, dest, at, tunables.cache_cell_m);
        match self.negative.get(&key) {
            Some(failed_at) => (now - *failed_at).num_seconds() <= tunables.cache_negative_ttl_s,
            None => false,
        }
    }

    fn mark_negative(&self, origin: GeoPoint, dest: GeoPoint, at: DateTime<Utc>, cell_m: f64, now: DateTime<Utc>) {
        let key = Self::key(origin, dest, at, cell_m);
        self.negative.insert(key, now);
    }
}

pub struct DistanceService {
    cache: Arc<DistanceCache>,
    provider: Arc<dyn RoutingProvider>,
    persistence: Option<Arc<dyn crate::ports::DistanceCacheRepository>>,
}

impl DistanceService {
    pub fn new(cache: Arc<DistanceCache>, provider: Arc<dyn RoutingProvider>) -> Self {
        Self { cache, provider, persistence: None }
    }

    /// Attach the durable backstop (§6 `distance_cache` table). Warm-fills
    /// the in-memory cache on a miss before falling back to the routing
    /// provider, and persists fresh entries in the background.
    pub fn with_persistence(mut self, repository: Arc<dyn crate::ports::DistanceCacheRepository>) -> Self {
        self.persistence = Some(repository);
        self
    }

    /// `cheapMatrix` — Haversine distance at a fixed average speed. Total
    /// order, deterministic, never fails.
    pub fn cheap_matrix(&self, origin: GeoPoint, destinations: &[GeoPoint], speed_kmh: f64) -> Vec<DistanceEta> {
        destinations
            .iter()
            .map(|dest| haversine(origin, *dest, speed_kmh))
            .collect()
    }

    /// `refinedMatrix` — cache-first, provider on miss, cheap fallback on
    /// provider error/timeout (§4.1). Never returns fewer entries than
    /// requested.
    pub async fn refined_matrix(
        &self,
        origin: GeoPoint,
        destinations: &[GeoPoint],
        at: DateTime<Utc>,
        now: DateTime<Utc>,
        tunables: &Tunables,
    ) -> Vec<DistanceEta> {
        let mut results = Vec::with_capacity(destinations.len());
        let mut miss_indices = Vec::new();

        for (i, dest) in destinations.iter().enumerate() {
            match self.cache.get(origin, *dest, at, now, tunables) {
                Some(v) => results.push(Some(v)),
                None => {
                    results.push(None);
                    if !self.cache.is_negative_cached(origin, *dest, at, now, tunables) {
                        miss_indices.push(i);
                    }
                }
            }
        }

        if let Some(repo) = &self.persistence {
            let mut still_missing = Vec::new();
            for &i in &miss_indices {
                let key = DistanceCache::key(origin, destinations[i], at, tunables.cache_cell_m);
                match repo.get(key).await {
                    Ok(Some(entry)) if !entry.is_expired(now, tunables.cache_routed_ttl_s, tunables.cache_haversine_ttl_s) => {
                        let eta = DistanceEta { dist_m: entry.dist_m, eta_min: entry.eta_min, source: entry.source };
                        self.cache.put(origin, destinations[i], at, tunables.cache_cell_m, eta, entry.observed_at);
                        results[i] = Some(eta);
                    }
                    _ => still_missing.push(i),
                }
            }
            miss_indices = still_missing;
        }

        let misses: Vec<GeoPoint> = miss_indices.iter().map(|&i| destinations[i]).collect();

        if !misses.is_empty() {
            match self.fetch_with_retry(origin, &misses, tunables).await {
                Ok(fetched) => {
                    for (idx, eta) in miss_indices.iter().zip(fetched.into_iter()) {
                        self.cache.put(origin, destinations[*idx], at, tunables.cache_cell_m, eta, now);
                        results[*idx] = Some(eta);

                        if let Some(repo) = self.persistence.clone() {
                            let key = DistanceCache::key(origin, destinations[*idx], at, tunables.cache_cell_m);
                            let entry = DistanceCacheEntry { dist_m: eta.dist_m, eta_min: eta.eta_min, observed_at: now, source: eta.source };
                            tokio::spawn(async move {
                                let _ = repo.put(key, entry).await;
                            });
                        }
                    }
                }
                Err(_) => {
                    for dest in &misses {
                        self.cache.mark_negative(origin, *dest, at, tunables.cache_cell_m, now);
                    }
                }
            }
        }

        destinations
            .iter()
            .zip(results)
            .map(|(dest, maybe)| {
                maybe.unwrap_or_else(|| haversine(origin, *dest, tunables.cheap_speed_kmh))
            })
            .collect()
    }

    /// Exponential backoff with jitter, bounded by the per-request deadline
    /// (§4.1 "Failure semantics"). Grounded on the pack's use of `rand` for
    /// probabilistic decisions (`VPRamon-virolai`, `Vincent-Fuecks-VRM-Rust-Workflow`).
    async fn fetch_with_retry(
        &self,
        origin: GeoPoint,
        destinations: &[GeoPoint],
        tunables: &Tunables,
    ) -> anyhow::Result<Vec<DistanceEta>> {
        let deadline = StdDuration::from_millis(tunables.deadline_routing_ms);
        let attempt_fut = async {
            let mut attempt = 0u32;
            loop {
                match self.provider.route_batch(origin, destinations).await {
                    Ok(v) => return Ok(v),
                    Err(e) if attempt >= 2 => return Err(e),
                    Err(_) => {
                        let base_ms = 20u64 * 2u64.pow(attempt);
                        let jitter_ms = rand::thread_rng().gen_range(0..=base_ms.max(1));
                        tokio::time::sleep(StdDuration::from_millis(base_ms + jitter_ms)).await;
                        attempt += 1;
                    }
                }
            }
        };

        match tokio::time::timeout(deadline, attempt_fut).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("routing provider deadline exceeded"),
        }
    }
}
