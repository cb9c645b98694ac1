//! Error types for the scoring engine.
use thiserror::Error;

use crate::types::InfluencerId;
use crate::weights::Factor;

/// Failures reported by a [`crate::traits::SignalSource`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("influencer not found: {0}")] NotFound(InfluencerId),
    #[error("signal data unavailable: {0}")] DataUnavailable(String),
    #[error("invalid signals: {0}")] Invalid(String),
}

/// Rejections of a weight configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing weight for factor {0}")] MissingFactor(Factor),
    #[error("unknown factor: {0}")] UnknownFactor(String),
    #[error("negative weight for {factor}: {value}")] NegativeWeight { factor: Factor, value: f64 },
    #[error("non-finite weight for {0}")] NonFiniteWeight(Factor),
    #[error("invalid parameter {name}: {reason}")] InvalidParameter { name: &'static str, reason: String },
}

/// Rejections of a tier threshold table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    #[error("tier table is empty")] Empty,
    #[error("tier {index} has an empty name")] EmptyName { index: usize },
    #[error("duplicate tier name: {0}")] DuplicateName(String),
    #[error("tier {index} has a non-finite minimum")] NonFinite { index: usize },
    #[error("tier {index} minimum is not above the previous tier")] NotIncreasing { index: usize },
}

/// Failures reported by a [`crate::traits::ScoreStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("score store unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("influencer not found: {0}")] NotFound(InfluencerId),
    #[error("data unavailable: {0}")] DataUnavailable(String),
    #[error("invalid signals for {id}: {reason}")] InvalidSignals { id: InfluencerId, reason: String },
    #[error("invalid configuration: {0}")] InvalidConfiguration(#[from] ConfigError),
    #[error("invalid thresholds: {0}")] InvalidThresholds(#[from] TierError),
    #[error("recalculation already in progress for {0}")] AlreadyInProgress(InfluencerId),
    #[error("persistence: {0}")] Persistence(#[from] StoreError),
}

impl EngineError {
    /// Lift a signal-source failure, attributing invalid data to `id`.
    pub fn from_signal(id: &InfluencerId, err: SignalError) -> Self {
        match err {
            SignalError::NotFound(missing) => EngineError::NotFound(missing),
            SignalError::DataUnavailable(reason) => EngineError::DataUnavailable(reason),
            SignalError::Invalid(reason) => EngineError::InvalidSignals {
                id: id.clone(),
                reason,
            },
        }
    }

    /// Transient failures worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::DataUnavailable(_) | EngineError::Persistence(_))
    }
}
