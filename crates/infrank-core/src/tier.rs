//! Tier tables.
//!
//! A tier table is configuration data: an ordered list of named score bands,
//! lowest first, with strictly increasing minimums. A [`TierTable`] can only
//! be built from a list that passes [`validate_thresholds`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{TIER_BRONZE_MIN, TIER_GOLD_MIN, TIER_PLATINUM_MIN, TIER_SILVER_MIN};
use crate::error::TierError;

/// A named band of scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub name: String,
    pub min_score: f64,
    /// Static benefits/requirements copy shown alongside the tier.
    #[serde(default)]
    pub benefits: Vec<String>,
}

impl Tier {
    pub fn new(name: impl Into<String>, min_score: f64) -> Self {
        Self {
            name: name.into(),
            min_score,
            benefits: Vec::new(),
        }
    }

    pub fn with_benefits(mut self, benefits: &[&str]) -> Self {
        self.benefits = benefits.iter().map(|b| b.to_string()).collect();
        self
    }
}

/// Check that `tiers` is non-empty, uniquely named, finite and strictly
/// increasing.
pub fn validate_thresholds(tiers: &[Tier]) -> Result<(), TierError> {
    if tiers.is_empty() {
        return Err(TierError::Empty);
    }
    let mut names = HashSet::with_capacity(tiers.len());
    for (index, tier) in tiers.iter().enumerate() {
        if tier.name.trim().is_empty() {
            return Err(TierError::EmptyName { index });
        }
        if !names.insert(tier.name.as_str()) {
            return Err(TierError::DuplicateName(tier.name.clone()));
        }
        if !tier.min_score.is_finite() {
            return Err(TierError::NonFinite { index });
        }
        if index > 0 && tier.min_score <= tiers[index - 1].min_score {
            return Err(TierError::NotIncreasing { index });
        }
    }
    Ok(())
}

/// Validated, ordered tier list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierTable(Vec<Tier>);

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierError> {
        validate_thresholds(&tiers)?;
        Ok(Self(tiers))
    }

    /// Tiers from lowest to highest.
    pub fn tiers(&self) -> &[Tier] {
        &self.0
    }

    pub fn lowest(&self) -> &Tier {
        // Non-empty by construction.
        &self.0[0]
    }

    pub fn highest(&self) -> &Tier {
        &self.0[self.0.len() - 1]
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.0.iter().find(|t| t.name == name)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self(vec![
            Tier::new("Bronze", TIER_BRONZE_MIN)
                .with_benefits(&["Listed in the influencer directory"]),
            Tier::new("Silver", TIER_SILVER_MIN)
                .with_benefits(&["Eligible for standard campaigns", "Profile badge"]),
            Tier::new("Gold", TIER_GOLD_MIN)
                .with_benefits(&["Priority in brand search results", "Featured campaign invites"]),
            Tier::new("Platinum", TIER_PLATINUM_MIN).with_benefits(&[
                "Top placement in brand search results",
                "Dedicated partner manager",
                "Early access to premium campaigns",
            ]),
        ])
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = TierError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.0
    }
}
