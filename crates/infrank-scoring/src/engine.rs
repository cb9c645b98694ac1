//! Scoring engine implementing the [`ScoreCalculator`] trait.
//!
//! Factor contributions:
//!
//! | Factor                  | Contribution                                      |
//! |-------------------------|---------------------------------------------------|
//! | completedCollaborations | `min(completed, cap) × w`                          |
//! | averageRating           | `(avg / 5) × w`, avg = neutral with no reviews     |
//! | completionRate          | `completed / total × w`, 0 when total = 0          |
//! | responseSpeed           | `response_factor(hours) × w`                       |
//! | verificationBonus       | `w` if verified, else 0                            |
//! | penalties               | `−count × w`                                       |
//!
//! The total is the sum clamped to `[0, max_score]`, where `max_score` is the
//! sum of every positive factor's maximum (optionally lowered by a ceiling).
//! Products and sums saturate at `f64::MAX`, so any validated configuration
//! yields a finite total.

use infrank_core::constants::MAX_RATING;
use infrank_core::error::SignalError;
use infrank_core::tier::TierTable;
use infrank_core::traits::ScoreCalculator;
use infrank_core::types::{FactorBreakdown, FactorScore, InfluencerId, ScoreBreakdown, SignalSet};
use infrank_core::weights::{WeightConfig, WeightSnapshot};

use crate::classify::{classify_table, requirements_met};
use crate::response::response_factor;

/// The production score calculator.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Numeric result of the formula, before tier classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub factors: FactorBreakdown,
    pub total_score: f64,
    pub max_score: f64,
}

/// Saturating product of two non-negative finite values.
fn sat_mul(a: f64, b: f64) -> f64 {
    (a * b).min(f64::MAX)
}

/// Saturating sum of non-negative finite values.
fn sat_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| (acc + v).min(f64::MAX))
}

/// Largest total a configuration can award.
///
/// `config` must pass [`WeightConfig::validate`].
pub fn max_score(config: &WeightConfig) -> f64 {
    let w = &config.weights;
    let natural = sat_sum([
        sat_mul(config.params.collab_cap as f64, w.completed_collaborations),
        w.average_rating,
        w.completion_rate,
        w.response_speed,
        w.verification_bonus,
    ]);
    match config.params.score_ceiling {
        Some(ceiling) => natural.min(ceiling),
        None => natural,
    }
}

/// Apply the formula to one signal set.
///
/// `config` must pass [`WeightConfig::validate`]; the engine's weight store
/// only ever publishes validated configurations. Fails only when `signals`
/// violates its own invariants.
pub fn score_signals(
    signals: &SignalSet,
    config: &WeightConfig,
) -> Result<ScoreComponents, SignalError> {
    signals.validate()?;
    let w = &config.weights;
    let params = &config.params;

    let capped = signals.completed_collaborations.min(params.collab_cap);
    let collab = FactorScore {
        value: signals.completed_collaborations as f64,
        contributed_score: sat_mul(capped as f64, w.completed_collaborations),
    };

    let average = signals
        .average_rating()
        .unwrap_or(params.neutral_rating)
        .clamp(0.0, MAX_RATING);
    let rating = FactorScore {
        value: average,
        contributed_score: average / MAX_RATING * w.average_rating,
    };

    let rate = signals.completion_rate();
    let completion = FactorScore {
        value: rate,
        contributed_score: rate * w.completion_rate,
    };

    let speed = response_factor(params.response_curve, signals.median_response_hours);
    let response = FactorScore {
        value: signals.median_response_hours,
        contributed_score: speed * w.response_speed,
    };

    let verification = FactorScore {
        value: if signals.is_verified { 1.0 } else { 0.0 },
        contributed_score: if signals.is_verified { w.verification_bonus } else { 0.0 },
    };

    let penalty_magnitude = sat_mul(signals.penalty_count as f64, w.penalties);
    let penalties = FactorScore {
        value: signals.penalty_count as f64,
        contributed_score: -penalty_magnitude,
    };

    let positive = sat_sum([
        collab.contributed_score,
        rating.contributed_score,
        completion.contributed_score,
        response.contributed_score,
        verification.contributed_score,
    ]);
    let max = max_score(config);
    // Both operands are finite, so the difference is too.
    let total = (positive - penalty_magnitude).max(0.0).min(max);

    Ok(ScoreComponents {
        factors: FactorBreakdown {
            completed_collaborations: collab,
            average_rating: rating,
            completion_rate: completion,
            response_speed: response,
            verification_bonus: verification,
            penalties,
        },
        total_score: total,
        max_score: max,
    })
}

impl ScoreCalculator for ScoringEngine {
    fn breakdown(
        &self,
        id: &InfluencerId,
        signals: &SignalSet,
        weights: &WeightSnapshot,
        tiers: &TierTable,
    ) -> Result<ScoreBreakdown, SignalError> {
        let components = score_signals(signals, &weights.config)?;
        let tier = classify_table(components.total_score, tiers);

        Ok(ScoreBreakdown {
            influencer_id: id.clone(),
            total_score: components.total_score,
            max_score: components.max_score,
            factors: components.factors,
            ranking_tier: tier.name.clone(),
            requirements_met: requirements_met(components.total_score, tiers),
            weights_version: weights.version,
            weights_fingerprint: weights.fingerprint.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrank_core::weights::{FactorWeights, ResponseCurve, ScoringParams};
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn example_signals() -> SignalSet {
        SignalSet {
            completed_collaborations: 12,
            total_collaborations: 15,
            rating_sum: 45.0,
            rating_count: 10,
            median_response_hours: 6.0,
            is_verified: true,
            penalty_count: 0,
        }
    }

    fn config() -> WeightConfig {
        WeightConfig::default()
    }

    fn snapshot() -> WeightSnapshot {
        WeightSnapshot::new(config(), 1)
    }

    fn zero_weights() -> FactorWeights {
        FactorWeights {
            completed_collaborations: 0.0,
            average_rating: 0.0,
            completion_rate: 0.0,
            response_speed: 0.0,
            verification_bonus: 0.0,
            penalties: 0.0,
        }
    }

    // --- worked example ---

    #[test]
    fn worked_example_totals_256_25() {
        let c = score_signals(&example_signals(), &config()).unwrap();
        let f = &c.factors;
        assert!((f.completed_collaborations.contributed_score - 50.0).abs() < EPS);
        assert!((f.average_rating.contributed_score - 90.0).abs() < EPS);
        assert!((f.completion_rate.contributed_score - 40.0).abs() < EPS);
        assert!((f.response_speed.contributed_score - 26.25).abs() < EPS);
        assert!((f.verification_bonus.contributed_score - 50.0).abs() < EPS);
        assert_eq!(f.penalties.contributed_score, 0.0);
        assert!((c.total_score - 256.25).abs() < EPS, "total {}", c.total_score);
        assert_eq!(c.max_score, 280.0);
    }

    #[test]
    fn worked_example_reports_measured_values() {
        let c = score_signals(&example_signals(), &config()).unwrap();
        assert_eq!(c.factors.completed_collaborations.value, 12.0);
        assert_eq!(c.factors.average_rating.value, 4.5);
        assert_eq!(c.factors.response_speed.value, 6.0);
        assert_eq!(c.factors.verification_bonus.value, 1.0);
    }

    #[test]
    fn ceiling_clamps_total() {
        let cfg = WeightConfig {
            params: ScoringParams {
                score_ceiling: Some(200.0),
                ..ScoringParams::default()
            },
            ..config()
        };
        let c = score_signals(&example_signals(), &cfg).unwrap();
        assert_eq!(c.max_score, 200.0);
        assert_eq!(c.total_score, 200.0);
    }

    // --- individual factors ---

    #[test]
    fn collaborations_are_capped() {
        let mut s = example_signals();
        s.completed_collaborations = 500;
        s.total_collaborations = 500;
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.factors.completed_collaborations.contributed_score, 50.0);
        assert_eq!(c.factors.completed_collaborations.value, 500.0);
    }

    #[test]
    fn no_reviews_scores_neutral_rating() {
        let s = SignalSet {
            rating_sum: 0.0,
            rating_count: 0,
            ..example_signals()
        };
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.factors.average_rating.value, 2.5);
        assert_eq!(c.factors.average_rating.contributed_score, 50.0);
    }

    #[test]
    fn neutral_rating_is_configurable() {
        let cfg = WeightConfig {
            params: ScoringParams {
                neutral_rating: 0.0,
                ..ScoringParams::default()
            },
            ..config()
        };
        let s = SignalSet::default();
        let c = score_signals(&s, &cfg).unwrap();
        assert_eq!(c.factors.average_rating.contributed_score, 0.0);
    }

    #[test]
    fn inconsistent_rating_sum_is_clamped_to_scale() {
        let s = SignalSet {
            rating_sum: 100.0,
            rating_count: 2,
            ..example_signals()
        };
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.factors.average_rating.value, 5.0);
        assert_eq!(c.factors.average_rating.contributed_score, 100.0);
    }

    #[test]
    fn zero_total_collaborations_complete_nothing() {
        let s = SignalSet::default();
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.factors.completion_rate.contributed_score, 0.0);
        assert!(c.total_score.is_finite());
    }

    #[test]
    fn penalties_subtract_and_floor_at_zero() {
        let mut s = example_signals();
        s.penalty_count = 2;
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.factors.penalties.contributed_score, -40.0);
        assert!((c.total_score - 216.25).abs() < EPS);

        s.penalty_count = 1_000;
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.total_score, 0.0);
    }

    #[test]
    fn unverified_gets_no_bonus() {
        let s = SignalSet {
            is_verified: false,
            ..example_signals()
        };
        let c = score_signals(&s, &config()).unwrap();
        assert_eq!(c.factors.verification_bonus.contributed_score, 0.0);
        assert_eq!(c.factors.verification_bonus.value, 0.0);
    }

    #[test]
    fn half_life_curve_is_used_when_configured() {
        let cfg = WeightConfig {
            params: ScoringParams {
                response_curve: ResponseCurve::HalfLife { half_life_hours: 6.0 },
                ..ScoringParams::default()
            },
            ..config()
        };
        let c = score_signals(&example_signals(), &cfg).unwrap();
        assert!((c.factors.response_speed.contributed_score - 15.0).abs() < EPS);
    }

    #[test]
    fn all_zero_weights_score_zero() {
        let cfg = WeightConfig::new(zero_weights(), ScoringParams::default());
        let c = score_signals(&example_signals(), &cfg).unwrap();
        assert_eq!(c.total_score, 0.0);
        assert_eq!(c.max_score, 0.0);
    }

    #[test]
    fn huge_weights_stay_finite() {
        let w = FactorWeights {
            completed_collaborations: f64::MAX,
            average_rating: f64::MAX,
            completion_rate: f64::MAX,
            response_speed: f64::MAX,
            verification_bonus: f64::MAX,
            penalties: f64::MAX,
        };
        let cfg = WeightConfig::new(w, ScoringParams::default());
        for penalty_count in [0, 1, 1_000] {
            let s = SignalSet {
                penalty_count,
                ..example_signals()
            };
            let c = score_signals(&s, &cfg).unwrap();
            assert!(c.total_score.is_finite());
            assert!(c.max_score.is_finite());
            assert!(c.total_score >= 0.0 && c.total_score <= c.max_score);
        }
    }

    #[test]
    fn invalid_signals_are_rejected() {
        let s = SignalSet {
            completed_collaborations: 5,
            total_collaborations: 4,
            ..SignalSet::default()
        };
        assert!(matches!(
            score_signals(&s, &config()),
            Err(SignalError::Invalid(_))
        ));
    }

    // --- ScoreCalculator ---

    #[test]
    fn breakdown_carries_tier_and_audit_fields() {
        let engine = ScoringEngine::new();
        let snap = snapshot();
        let id = InfluencerId::from("inf-42");
        let b = engine
            .breakdown(&id, &example_signals(), &snap, &TierTable::default())
            .unwrap();
        assert_eq!(b.influencer_id, id);
        assert_eq!(b.ranking_tier, "Platinum");
        assert_eq!(b.weights_version, 1);
        assert_eq!(b.weights_fingerprint, snap.fingerprint);
        assert!(b.requirements_met.values().all(|met| *met));
    }

    #[test]
    fn breakdown_is_bit_identical_across_calls() {
        let engine = ScoringEngine::new();
        let snap = snapshot();
        let id = InfluencerId::from("inf-1");
        let tiers = TierTable::default();
        let a = engine.breakdown(&id, &example_signals(), &snap, &tiers).unwrap();
        let b = engine.breakdown(&id, &example_signals(), &snap, &tiers).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.total_score.to_bits(), b.total_score.to_bits());
    }

    // --- properties ---

    fn arb_signals() -> impl Strategy<Value = SignalSet> {
        (
            0u64..1_000,
            0u64..1_000,
            0u64..500,
            0.0f64..=5.0,
            0.0f64..1_000.0,
            any::<bool>(),
            0u64..100,
        )
            .prop_map(|(completed, extra, rating_count, avg, hours, verified, penalties)| {
                SignalSet {
                    completed_collaborations: completed,
                    total_collaborations: completed + extra,
                    rating_sum: avg * rating_count as f64,
                    rating_count,
                    median_response_hours: hours,
                    is_verified: verified,
                    penalty_count: penalties,
                }
            })
    }

    fn arb_config() -> impl Strategy<Value = WeightConfig> {
        (
            prop::array::uniform6(0.0f64..1e6),
            0u64..100,
            0.0f64..=5.0,
            prop::option::of(0.0f64..1e6),
        )
            .prop_map(|(w, cap, neutral, ceiling)| WeightConfig {
                weights: FactorWeights {
                    completed_collaborations: w[0],
                    average_rating: w[1],
                    completion_rate: w[2],
                    response_speed: w[3],
                    verification_bonus: w[4],
                    penalties: w[5],
                },
                params: ScoringParams {
                    collab_cap: cap,
                    neutral_rating: neutral,
                    score_ceiling: ceiling,
                    ..ScoringParams::default()
                },
            })
    }

    proptest! {
        #[test]
        fn total_bounded_and_finite(s in arb_signals(), cfg in arb_config()) {
            let c = score_signals(&s, &cfg).unwrap();
            prop_assert!(c.total_score.is_finite());
            prop_assert!(c.total_score >= 0.0);
            prop_assert!(c.total_score <= c.max_score);
        }

        #[test]
        fn deterministic(s in arb_signals(), cfg in arb_config()) {
            let a = score_signals(&s, &cfg).unwrap();
            let b = score_signals(&s, &cfg).unwrap();
            prop_assert_eq!(a.total_score.to_bits(), b.total_score.to_bits());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn non_decreasing_in_completed(s in arb_signals(), cfg in arb_config(), more in 1u64..50) {
            let better = SignalSet {
                completed_collaborations: s.completed_collaborations + more,
                total_collaborations: s.total_collaborations + more,
                ..s.clone()
            };
            let lo = score_signals(&s, &cfg).unwrap().total_score;
            let hi = score_signals(&better, &cfg).unwrap().total_score;
            prop_assert!(hi >= lo, "{hi} < {lo}");
        }

        #[test]
        fn non_decreasing_in_rating(s in arb_signals(), cfg in arb_config(), bump in 0.01f64..5.0) {
            prop_assume!(s.rating_count > 0);
            let current = s.rating_sum / s.rating_count as f64;
            let target = (current + bump).min(5.0);
            let better = SignalSet {
                rating_sum: target * s.rating_count as f64,
                ..s.clone()
            };
            let lo = score_signals(&s, &cfg).unwrap().total_score;
            let hi = score_signals(&better, &cfg).unwrap().total_score;
            prop_assert!(hi >= lo, "{hi} < {lo}");
        }

        #[test]
        fn non_decreasing_in_completion_rate(s in arb_signals(), cfg in arb_config()) {
            prop_assume!(s.total_collaborations > s.completed_collaborations);
            // Fewer abandoned collaborations, same completed count.
            let better = SignalSet {
                total_collaborations: s.total_collaborations - 1,
                ..s.clone()
            };
            let lo = score_signals(&s, &cfg).unwrap().total_score;
            let hi = score_signals(&better, &cfg).unwrap().total_score;
            prop_assert!(hi >= lo, "{hi} < {lo}");
        }

        #[test]
        fn non_increasing_in_penalties(s in arb_signals(), cfg in arb_config(), more in 1u64..50) {
            let worse = SignalSet {
                penalty_count: s.penalty_count + more,
                ..s.clone()
            };
            let hi = score_signals(&s, &cfg).unwrap().total_score;
            let lo = score_signals(&worse, &cfg).unwrap().total_score;
            prop_assert!(lo <= hi, "{lo} > {hi}");
        }
    }
}
