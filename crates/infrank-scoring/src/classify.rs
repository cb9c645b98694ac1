//! Tier classification.

use std::collections::BTreeMap;

use infrank_core::error::TierError;
use infrank_core::tier::{validate_thresholds, Tier, TierTable};

/// Highest tier whose minimum is `<= total`.
///
/// A score exactly on a threshold belongs to the higher tier. Scores below
/// the lowest minimum fall into the lowest tier. Fails with [`TierError`] when
/// `thresholds` is empty or not strictly increasing.
pub fn classify(total: f64, thresholds: &[Tier]) -> Result<&Tier, TierError> {
    validate_thresholds(thresholds)?;
    Ok(pick(total, thresholds))
}

/// [`classify`] against a table that is already known to be valid.
pub fn classify_table(total: f64, table: &TierTable) -> &Tier {
    pick(total, table.tiers())
}

/// Tier name to whether `total` reaches that tier's minimum.
pub fn requirements_met(total: f64, table: &TierTable) -> BTreeMap<String, bool> {
    table
        .tiers()
        .iter()
        .map(|t| (t.name.clone(), total >= t.min_score))
        .collect()
}

fn pick(total: f64, tiers: &[Tier]) -> &Tier {
    tiers
        .iter()
        .rev()
        .find(|t| t.min_score <= total)
        .unwrap_or(&tiers[0])
}
