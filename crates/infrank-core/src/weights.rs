//! Weight configuration: one non-negative weight per scoring factor plus the
//! tunable parameters of the formula.
//!
//! A [`WeightConfig`] is plain data. The engine publishes it wrapped in a
//! [`WeightSnapshot`] that adds the store version and an audit fingerprint;
//! computations hold the snapshot by `Arc` so a concurrent replace never
//! changes the values under them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COLLAB_CAP, DEFAULT_NEUTRAL_RATING, DEFAULT_RESPONSE_HORIZON_HOURS,
    DEFAULT_WEIGHT_AVERAGE_RATING, DEFAULT_WEIGHT_COMPLETED_COLLABORATIONS,
    DEFAULT_WEIGHT_COMPLETION_RATE, DEFAULT_WEIGHT_PENALTIES, DEFAULT_WEIGHT_RESPONSE_SPEED,
    DEFAULT_WEIGHT_VERIFICATION_BONUS, MAX_RATING,
};
use crate::error::ConfigError;

/// A scoring factor recognised by the formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Factor {
    CompletedCollaborations,
    AverageRating,
    CompletionRate,
    ResponseSpeed,
    VerificationBonus,
    Penalties,
}

impl Factor {
    pub const ALL: [Factor; 6] = [
        Factor::CompletedCollaborations,
        Factor::AverageRating,
        Factor::CompletionRate,
        Factor::ResponseSpeed,
        Factor::VerificationBonus,
        Factor::Penalties,
    ];

    /// Wire name, as used in weight maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Factor::CompletedCollaborations => "completedCollaborations",
            Factor::AverageRating => "averageRating",
            Factor::CompletionRate => "completionRate",
            Factor::ResponseSpeed => "responseSpeed",
            Factor::VerificationBonus => "verificationBonus",
            Factor::Penalties => "penalties",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Factor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownFactor(s.to_string()))
    }
}

/// One weight per [`Factor`].
///
/// Serialized as a `factor name -> weight` map. Deserialization rejects maps
/// with missing or unknown factors rather than defaulting them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct FactorWeights {
    pub completed_collaborations: f64,
    pub average_rating: f64,
    pub completion_rate: f64,
    pub response_speed: f64,
    pub verification_bonus: f64,
    /// Magnitude per penalty event; the formula applies the sign.
    pub penalties: f64,
}

impl FactorWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::CompletedCollaborations => self.completed_collaborations,
            Factor::AverageRating => self.average_rating,
            Factor::CompletionRate => self.completion_rate,
            Factor::ResponseSpeed => self.response_speed,
            Factor::VerificationBonus => self.verification_bonus,
            Factor::Penalties => self.penalties,
        }
    }

    fn slot(&mut self, factor: Factor) -> &mut f64 {
        match factor {
            Factor::CompletedCollaborations => &mut self.completed_collaborations,
            Factor::AverageRating => &mut self.average_rating,
            Factor::CompletionRate => &mut self.completion_rate,
            Factor::ResponseSpeed => &mut self.response_speed,
            Factor::VerificationBonus => &mut self.verification_bonus,
            Factor::Penalties => &mut self.penalties,
        }
    }

    /// Every weight must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for factor in Factor::ALL {
            let value = self.get(factor);
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteWeight(factor));
            }
            if value < 0.0 {
                return Err(ConfigError::NegativeWeight { factor, value });
            }
        }
        Ok(())
    }

    /// Sum of all weights. Admin tooling may advise keeping this at 100;
    /// the engine does not require it.
    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            completed_collaborations: DEFAULT_WEIGHT_COMPLETED_COLLABORATIONS,
            average_rating: DEFAULT_WEIGHT_AVERAGE_RATING,
            completion_rate: DEFAULT_WEIGHT_COMPLETION_RATE,
            response_speed: DEFAULT_WEIGHT_RESPONSE_SPEED,
            verification_bonus: DEFAULT_WEIGHT_VERIFICATION_BONUS,
            penalties: DEFAULT_WEIGHT_PENALTIES,
        }
    }
}

impl TryFrom<BTreeMap<String, f64>> for FactorWeights {
    type Error = ConfigError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut parsed = BTreeMap::new();
        for (name, value) in map {
            parsed.insert(name.parse::<Factor>()?, value);
        }

        let mut weights = FactorWeights::default();
        for factor in Factor::ALL {
            let value = parsed
                .get(&factor)
                .copied()
                .ok_or(ConfigError::MissingFactor(factor))?;
            *weights.slot(factor) = value;
        }
        weights.validate()?;
        Ok(weights)
    }
}

impl From<FactorWeights> for BTreeMap<String, f64> {
    fn from(w: FactorWeights) -> Self {
        Factor::ALL
            .into_iter()
            .map(|f| (f.as_str().to_string(), w.get(f)))
            .collect()
    }
}

/// Maps median response latency to a multiplier in `[0, 1]`.
///
/// Both curves are monotonically non-increasing in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ResponseCurve {
    /// `max(0, 1 - hours / horizon_hours)`.
    Linear { horizon_hours: f64 },
    /// `0.5 ^ (hours / half_life_hours)`.
    HalfLife { half_life_hours: f64 },
}

impl Default for ResponseCurve {
    fn default() -> Self {
        ResponseCurve::Linear {
            horizon_hours: DEFAULT_RESPONSE_HORIZON_HOURS,
        }
    }
}

/// Tunable constants of the scoring formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringParams {
    pub collab_cap: u64,
    /// Average rating assumed when a profile has no reviews.
    pub neutral_rating: f64,
    pub response_curve: ResponseCurve,
    /// Optional hard ceiling below the natural maximum.
    pub score_ceiling: Option<f64>,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            collab_cap: DEFAULT_COLLAB_CAP,
            neutral_rating: DEFAULT_NEUTRAL_RATING,
            response_curve: ResponseCurve::default(),
            score_ceiling: None,
        }
    }
}

impl ScoringParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.neutral_rating.is_finite()
            || !(0.0..=MAX_RATING).contains(&self.neutral_rating)
        {
            return Err(ConfigError::InvalidParameter {
                name: "neutralRating",
                reason: format!("must be within [0, {MAX_RATING}], got {}", self.neutral_rating),
            });
        }
        let (name, span) = match self.response_curve {
            ResponseCurve::Linear { horizon_hours } => ("horizonHours", horizon_hours),
            ResponseCurve::HalfLife { half_life_hours } => ("halfLifeHours", half_life_hours),
        };
        if !span.is_finite() || span <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name,
                reason: format!("must be finite and positive, got {span}"),
            });
        }
        if let Some(ceiling) = self.score_ceiling {
            if !ceiling.is_finite() || ceiling < 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name: "scoreCeiling",
                    reason: format!("must be finite and non-negative, got {ceiling}"),
                });
            }
        }
        Ok(())
    }
}

/// Complete configuration the scoring formula runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightConfig {
    pub weights: FactorWeights,
    #[serde(default)]
    pub params: ScoringParams,
}

impl WeightConfig {
    pub fn new(weights: FactorWeights, params: ScoringParams) -> Self {
        Self { weights, params }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.params.validate()
    }

    /// Hex blake3 digest over every weight and parameter.
    ///
    /// Two configurations share a fingerprint exactly when they score every
    /// signal set identically, which lets a historical score be reproduced
    /// from logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for factor in Factor::ALL {
            hasher.update(factor.as_str().as_bytes());
            hasher.update(&self.weights.get(factor).to_le_bytes());
        }
        hasher.update(&self.params.collab_cap.to_le_bytes());
        hasher.update(&self.params.neutral_rating.to_le_bytes());
        match self.params.response_curve {
            ResponseCurve::Linear { horizon_hours } => {
                hasher.update(b"linear");
                hasher.update(&horizon_hours.to_le_bytes());
            }
            ResponseCurve::HalfLife { half_life_hours } => {
                hasher.update(b"halfLife");
                hasher.update(&half_life_hours.to_le_bytes());
            }
        }
        match self.params.score_ceiling {
            Some(ceiling) => {
                hasher.update(&[1]);
                hasher.update(&ceiling.to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

/// An immutable, versioned weight configuration as published by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSnapshot {
    pub config: WeightConfig,
    pub version: u64,
    pub fingerprint: String,
}

impl WeightSnapshot {
    pub fn new(config: WeightConfig, version: u64) -> Self {
        let fingerprint = config.fingerprint();
        Self {
            config,
            version,
            fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_map() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("completedCollaborations".to_string(), 5.0),
            ("averageRating".to_string(), 100.0),
            ("completionRate".to_string(), 50.0),
            ("responseSpeed".to_string(), 30.0),
            ("verificationBonus".to_string(), 50.0),
            ("penalties".to_string(), 20.0),
        ])
    }

    #[test]
    fn factor_names_round_trip() {
        for f in Factor::ALL {
            assert_eq!(f.as_str().parse::<Factor>().unwrap(), f);
        }
        assert_eq!(
            "followers".parse::<Factor>(),
            Err(ConfigError::UnknownFactor("followers".into()))
        );
    }

    #[test]
    fn complete_map_parses() {
        let w = FactorWeights::try_from(weight_map()).unwrap();
        assert_eq!(w, FactorWeights::default());
        assert_eq!(w.total(), 255.0);
    }

    #[test]
    fn missing_factor_is_rejected_not_zeroed() {
        let mut map = weight_map();
        map.remove("responseSpeed");
        assert_eq!(
            FactorWeights::try_from(map),
            Err(ConfigError::MissingFactor(Factor::ResponseSpeed))
        );
    }

    #[test]
    fn unknown_factor_is_rejected() {
        let mut map = weight_map();
        map.insert("followerCount".into(), 1.0);
        assert!(matches!(
            FactorWeights::try_from(map),
            Err(ConfigError::UnknownFactor(name)) if name == "followerCount"
        ));
    }

    #[test]
    fn negative_and_non_finite_weights_are_rejected() {
        let mut map = weight_map();
        map.insert("penalties".into(), -20.0);
        assert_eq!(
            FactorWeights::try_from(map),
            Err(ConfigError::NegativeWeight { factor: Factor::Penalties, value: -20.0 })
        );

        let w = FactorWeights {
            average_rating: f64::INFINITY,
            ..FactorWeights::default()
        };
        assert_eq!(w.validate(), Err(ConfigError::NonFiniteWeight(Factor::AverageRating)));
    }

    #[test]
    fn all_zero_weights_are_acceptable() {
        let w = FactorWeights {
            completed_collaborations: 0.0,
            average_rating: 0.0,
            completion_rate: 0.0,
            response_speed: 0.0,
            verification_bonus: 0.0,
            penalties: 0.0,
        };
        assert!(w.validate().is_ok());
    }

    #[test]
    fn weight_config_deserializes_with_default_params() {
        let json = r#"{"weights": {
            "completedCollaborations": 1, "averageRating": 2, "completionRate": 3,
            "responseSpeed": 4, "verificationBonus": 5, "penalties": 6 }}"#;
        let cfg: WeightConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.weights.penalties, 6.0);
        assert_eq!(cfg.params, ScoringParams::default());
    }

    #[test]
    fn weight_config_json_rejects_missing_factor() {
        let json = r#"{"weights": {"averageRating": 2}}"#;
        let err = serde_json::from_str::<WeightConfig>(json).unwrap_err();
        assert!(err.to_string().contains("missing weight"), "{err}");
    }

    #[test]
    fn response_curve_is_tagged() {
        let json = r#"{"kind": "halfLife", "halfLifeHours": 12}"#;
        let curve: ResponseCurve = serde_json::from_str(json).unwrap();
        assert_eq!(curve, ResponseCurve::HalfLife { half_life_hours: 12.0 });
    }

    #[test]
    fn params_validation() {
        assert!(ScoringParams::default().validate().is_ok());

        let p = ScoringParams {
            neutral_rating: 6.0,
            ..ScoringParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::InvalidParameter { name: "neutralRating", .. })
        ));

        let p = ScoringParams {
            response_curve: ResponseCurve::Linear { horizon_hours: 0.0 },
            ..ScoringParams::default()
        };
        assert!(p.validate().is_err());

        let p = ScoringParams {
            score_ceiling: Some(f64::NAN),
            ..ScoringParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn fingerprint_tracks_every_value() {
        let base = WeightConfig::default();
        assert_eq!(base.fingerprint(), WeightConfig::default().fingerprint());
        assert_eq!(base.fingerprint().len(), 64);

        let heavier = WeightConfig {
            weights: FactorWeights {
                penalties: 21.0,
                ..base.weights
            },
            ..base
        };
        assert_ne!(base.fingerprint(), heavier.fingerprint());

        let capped = WeightConfig {
            params: ScoringParams {
                score_ceiling: Some(100.0),
                ..base.params
            },
            ..base
        };
        assert_ne!(base.fingerprint(), capped.fingerprint());
    }

    #[test]
    fn snapshot_carries_fingerprint() {
        let snap = WeightSnapshot::new(WeightConfig::default(), 3);
        assert_eq!(snap.version, 3);
        assert_eq!(snap.fingerprint, WeightConfig::default().fingerprint());
    }
}
