//! C7 — Scorer: weighted factor scores, deterministic tie-breakers, and a
//! templated rationale string (§4.6). Shape grounded on `iqrah-core`'s
//! `scheduler_v2::scoring` weighted priority-score pattern, generalized to
//! four named factors and an explicit `ScoreBreakdown` (§4 supplemented
//! feature) instead of FSRS-specific inputs.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use smartscheduler_domain::audit::ScoreBreakdown;
use smartscheduler_domain::weights::WeightsConfig;

/// Inputs to the scorer for a single contractor candidate.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub minutes_until_earliest: Option<i64>,
    pub horizon_min: i64,
    pub rating: u8,
    pub distance_m: f64,
    pub assignments_last_window: u32,
}

fn round_half_up(x: f64) -> u32 {
    (x + 0.5).floor().max(0.0) as u32
}

fn availability_score(minutes_until_earliest: Option<i64>, horizon_min: i64) -> u32 {
    let horizon = horizon_min.max(60) as f64;
    match minutes_until_earliest {
        None => 0,
        Some(minutes) => {
            let penalty = (minutes as f64 / horizon * 100.0).clamp(0.0, 100.0);
            round_half_up((100.0 - penalty).clamp(0.0, 100.0))
        }
    }
}

fn distance_score(distance_m: f64, d_max_m: f64) -> u32 {
    if d_max_m <= 0.0 {
        return 0;
    }
    let fraction = (1.0 - distance_m / d_max_m).max(0.0);
    round_half_up(100.0 * fraction)
}

fn rotation_score(assignments_last_window: u32, rotation_cap: u32) -> u32 {
    if rotation_cap == 0 {
        return 0;
    }
    let fraction = (1.0 - assignments_last_window as f64 / rotation_cap as f64).max(0.0);
    round_half_up(100.0 * fraction)
}

/// Build a short deterministic rationale (§4.6): names the two
/// highest-contributing factors by their weighted contribution, plus the
/// tie-breaker if one is supplied. Always ≤200 characters.
fn build_rationale(
    availability: u32,
    rating: u32,
    distance: u32,
    rotation: u32,
    weights: &WeightsConfig,
    eta_min: f64,
    tie_breaker: Option<&str>,
) -> String {
    let mut contributions = vec![
        ("availability", weights.w_availability * availability as f64, availability),
        ("rating", weights.w_rating * rating as f64, rating),
        ("distance", weights.w_distance * distance as f64, distance),
        ("rotation", weights.w_rotation * rotation as f64, rotation),
    ];
    contributions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let describe = |name: &str, raw: u32| -> String {
        match name {
            "availability" if raw >= 70 => "High availability".to_string(),
            "availability" => "Limited availability".to_string(),
            "distance" => format!("short travel ({} min)", eta_min.round() as i64),
            "rating" => format!("rating {raw}"),
            "rotation" if raw >= 70 => "due for rotation".to_string(),
            "rotation" => "recently assigned".to_string(),
            _ => name.to_string(),
        }
    };

    let mut rationale = format!(
        "{} and {}.",
        describe(contributions[0].0, contributions[0].2),
        describe(contributions[1].0, contributions[1].2)
    );

    if let Some(tb) = tie_breaker {
        rationale.push_str(&format!(" Tie-broken by {tb}."));
    }

    if rationale.len() > 200 {
        rationale.truncate(197);
        rationale.push_str("...");
    }
    rationale
}

/// Compute the factor scores, final score, and rationale for one candidate.
pub fn score_candidate(
    inputs: ScoreInputs,
    weights: &WeightsConfig,
    eta_min: f64,
    tie_breaker: Option<&str>,
) -> ScoreBreakdown {
    let availability = availability_score(inputs.minutes_until_earliest, inputs.horizon_min);
    let rating = inputs.rating as u32;
    let distance = distance_score(inputs.distance_m, weights.tunables.score_d_max_m);
    let rotation = rotation_score(inputs.assignments_last_window, weights.tunables.rotation_cap);

    let sum = weights.weight_sum();
    let final_raw = if sum > 0.0 {
        (weights.w_availability * availability as f64
            + weights.w_rating * rating as f64
            + weights.w_distance * distance as f64
            + weights.w_rotation * rotation as f64)
            / sum
    } else {
        0.0
    };
    let final_score = round_half_up(final_raw).min(100);

    let rationale = build_rationale(availability, rating, distance, rotation, weights, eta_min, tie_breaker);

    ScoreBreakdown {
        availability,
        rating,
        distance,
        rotation,
        final_score,
        rationale,
    }
}

/// A scored candidate paired with the identity fields the tie-breaker chain
/// needs (§4.6: rating desc, ETA asc, earliest-start asc, id asc).
#[derive(Debug, Clone)]
pub struct RankableCandidate<T> {
    pub contractor_id: Uuid,
    pub rating: u8,
    pub eta_min: f64,
    pub earliest_start: Option<DateTime<Utc>>,
    pub breakdown: ScoreBreakdown,
    pub payload: T,
}

/// Sort candidates by `final_score` descending, breaking ties per §4.6's
/// exact ordered chain.
pub fn rank_candidates<T>(mut candidates: Vec<RankableCandidate<T>>) -> Vec<RankableCandidate<T>> {
    candidates.sort_by(|a, b| {
        b.breakdown
            .final_score
            .cmp(&a.breakdown.final_score)
            .then_with(|| b.rating.cmp(&a.rating))
            .then_with(|| a.eta_min.partial_cmp(&b.eta_min).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.earliest_start.cmp(&b.earliest_start))
            .then_with(|| a.contractor_id.cmp(&b.contractor_id))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartscheduler_domain::weights::WeightsConfig;

    #[test]
    fn availability_score_decreases_with_wait() {
        let near = availability_score(Some(5), 120);
        let far = availability_score(Some(100), 120);
        assert!(near > far);
    }

    #[test]
    fn distance_score_zero_beyond_cap() {
        assert_eq!(distance_score(100_000.0, 80_000.0), 0);
    }

    #[test]
    fn rotation_score_saturates_at_cap() {
        assert_eq!(rotation_score(25, 20), 0);
        assert_eq!(rotation_score(0, 20), 100);
    }

    #[test]
    fn final_score_uses_active_weights() {
        let weights = WeightsConfig::default_v1();
        let inputs = ScoreInputs {
            minutes_until_earliest: Some(10),
            horizon_min: 480,
            rating: 90,
            distance_m: 1000.0,
            assignments_last_window: 2,
        };
        let breakdown = score_candidate(inputs, &weights, 5.0, None);
        assert!(breakdown.final_score <= 100);
        assert!(!breakdown.rationale.is_empty());
        assert!(breakdown.rationale.len() <= 200);
    }

    #[test]
    fn rank_candidates_breaks_ties_by_rating_then_eta_then_id() {
        let weights = WeightsConfig::default_v1();
        let make = |id: Uuid, rating: u8, eta: f64| RankableCandidate {
            contractor_id: id,
            rating,
            eta_min: eta,
            earliest_start: None,
            breakdown: ScoreBreakdown {
                availability: 50,
                rating: rating as u32,
                distance: 50,
                rotation: 50,
                final_score: 50,
                rationale: "x".into(),
            },
            payload: (),
        };
        let a = make(Uuid::from_u128(1), 80, 10.0);
        let b = make(Uuid::from_u128(2), 90, 5.0);
        let ranked = rank_candidates(vec![a.clone(), b.clone()]);
        assert_eq!(ranked[0].contractor_id, b.contractor_id);
        let _ = weights;
    }
}
