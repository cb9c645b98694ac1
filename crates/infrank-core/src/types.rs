//! Signal inputs and score outputs.
//!
//! A [`SignalSet`] is what the engine reads about an influencer; a
//! [`ScoreBreakdown`] is what it derives from it. Breakdowns carry no
//! timestamps so that recomputing from the same inputs yields an equal value;
//! the persisted [`ScoreRecord`] adds the recomputation time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::weights::Factor;

/// Opaque identifier of an influencer profile in the external store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfluencerId(String);

impl InfluencerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InfluencerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InfluencerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for InfluencerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Raw per-influencer aggregates consumed by the scoring formula.
///
/// # Invariants
///
/// * `completed_collaborations <= total_collaborations`
/// * `rating_sum` and `median_response_hours` are finite and non-negative
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSet {
    pub completed_collaborations: u64,
    pub total_collaborations: u64,
    pub rating_sum: f64,
    pub rating_count: u64,
    pub median_response_hours: f64,
    pub is_verified: bool,
    pub penalty_count: u64,
}

impl SignalSet {
    /// Check the invariants above.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.completed_collaborations > self.total_collaborations {
            return Err(SignalError::Invalid(format!(
                "completed collaborations {} exceed total {}",
                self.completed_collaborations, self.total_collaborations
            )));
        }
        if !self.rating_sum.is_finite() || self.rating_sum < 0.0 {
            return Err(SignalError::Invalid(format!(
                "rating sum must be finite and non-negative, got {}",
                self.rating_sum
            )));
        }
        if !self.median_response_hours.is_finite() || self.median_response_hours < 0.0 {
            return Err(SignalError::Invalid(format!(
                "median response hours must be finite and non-negative, got {}",
                self.median_response_hours
            )));
        }
        Ok(())
    }

    /// Mean review rating, or `None` when the profile has no reviews.
    pub fn average_rating(&self) -> Option<f64> {
        if self.rating_count == 0 {
            None
        } else {
            Some(self.rating_sum / self.rating_count as f64)
        }
    }

    /// Share of collaborations that were completed; 0 when there are none.
    pub fn completion_rate(&self) -> f64 {
        if self.total_collaborations == 0 {
            0.0
        } else {
            self.completed_collaborations as f64 / self.total_collaborations as f64
        }
    }
}

/// Measured input and resulting contribution of one factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScore {
    /// The count or measurement the factor was computed from.
    pub value: f64,
    pub contributed_score: f64,
}

/// Per-factor contributions of a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorBreakdown {
    pub completed_collaborations: FactorScore,
    pub average_rating: FactorScore,
    pub completion_rate: FactorScore,
    pub response_speed: FactorScore,
    pub verification_bonus: FactorScore,
    /// `contributed_score` is always `<= 0`.
    pub penalties: FactorScore,
}

impl FactorBreakdown {
    pub fn get(&self, factor: Factor) -> FactorScore {
        match factor {
            Factor::CompletedCollaborations => self.completed_collaborations,
            Factor::AverageRating => self.average_rating,
            Factor::CompletionRate => self.completion_rate,
            Factor::ResponseSpeed => self.response_speed,
            Factor::VerificationBonus => self.verification_bonus,
            Factor::Penalties => self.penalties,
        }
    }
}

/// Full derived output for one influencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub influencer_id: InfluencerId,
    /// Always within `[0, max_score]`.
    pub total_score: f64,
    pub max_score: f64,
    pub factors: FactorBreakdown,
    pub ranking_tier: String,
    /// Tier name to whether `total_score` reaches its minimum.
    pub requirements_met: BTreeMap<String, bool>,
    pub weights_version: u64,
    /// blake3 digest of the weight configuration the score was computed with.
    pub weights_fingerprint: String,
}

impl ScoreBreakdown {
    /// Total score as a percentage of the attainable maximum.
    pub fn percent(&self) -> f64 {
        if self.max_score > 0.0 {
            self.total_score / self.max_score * 100.0
        } else {
            0.0
        }
    }
}

/// Persisted form of a breakdown, versioned by recomputation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub breakdown: ScoreBreakdown,
    pub computed_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(breakdown: ScoreBreakdown) -> Self {
        Self {
            breakdown,
            computed_at: Utc::now(),
        }
    }

    pub fn influencer_id(&self) -> &InfluencerId {
        &self.breakdown.influencer_id
    }
}

/// One page of the ascending influencer id sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPage {
    pub ids: Vec<InfluencerId>,
    /// Cursor for the following page; `None` once the sequence is exhausted.
    pub next: Option<InfluencerId>,
}

/// Outcome of a fleet-wide recalculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub failed_ids: Vec<InfluencerId>,
    /// Ids left alone because another recalculation held their lock.
    pub skipped_ids: Vec<InfluencerId>,
    pub cancelled: bool,
    /// Set when paging through the population failed and the run stopped early.
    pub list_error: Option<String>,
}

impl BatchSummary {
    /// True when every listed influencer was either processed or skipped.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.list_error.is_none() && self.failed == 0
    }
}
