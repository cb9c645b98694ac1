//! Versioned weight and tier configuration.
//!
//! Both stores publish immutable snapshots behind an `Arc`. A recalculation
//! clones the `Arc` once before computing, so a concurrent replacement never
//! yields a score computed from a mix of old and new values. Replacement is a
//! pointer swap under a short write lock.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use infrank_core::error::{ConfigError, TierError};
use infrank_core::tier::{Tier, TierTable};
use infrank_core::weights::{WeightConfig, WeightSnapshot};

/// Holder of the current [`WeightSnapshot`].
#[derive(Debug)]
pub struct WeightStore {
    current: RwLock<Arc<WeightSnapshot>>,
}

impl WeightStore {
    /// Start at version 1 with `config`, which must be valid.
    pub fn new(config: WeightConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(WeightSnapshot::new(config, 1))),
        })
    }

    pub fn current(&self) -> Arc<WeightSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Validate and publish `config`, returning the new version.
    ///
    /// On error the current snapshot is left untouched.
    pub fn replace(&self, config: WeightConfig) -> Result<u64, ConfigError> {
        config.validate()?;
        let mut current = self.current.write();
        let version = current.version + 1;
        let snapshot = Arc::new(WeightSnapshot::new(config, version));
        info!(
            version,
            fingerprint = %snapshot.fingerprint,
            total_weight = snapshot.config.weights.total(),
            "weights: published new configuration"
        );
        *current = snapshot;
        Ok(version)
    }
}

impl Default for WeightStore {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(WeightSnapshot::new(WeightConfig::default(), 1))),
        }
    }
}

/// An immutable, versioned tier table.
#[derive(Debug, Clone, PartialEq)]
pub struct TierSnapshot {
    pub table: TierTable,
    pub version: u64,
}

/// Holder of the current [`TierSnapshot`].
#[derive(Debug)]
pub struct TierStore {
    current: RwLock<Arc<TierSnapshot>>,
}

impl TierStore {
    pub fn new(table: TierTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(TierSnapshot { table, version: 1 })),
        }
    }

    pub fn current(&self) -> Arc<TierSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Validate and publish `tiers`, returning the new version.
    pub fn replace(&self, tiers: Vec<Tier>) -> Result<u64, TierError> {
        let table = TierTable::new(tiers)?;
        let mut current = self.current.write();
        let version = current.version + 1;
        info!(version, tiers = table.tiers().len(), "tiers: published new thresholds");
        *current = Arc::new(TierSnapshot { table, version });
        Ok(version)
    }
}

impl Default for TierStore {
    fn default() -> Self {
        Self::new(TierTable::default())
    }
}
