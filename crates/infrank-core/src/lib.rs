//! # infrank-core
//! Foundation types and traits for the influencer ranking engine.
//!
//! Everything here is plain data or an interface: signal sets, weight
//! configurations, tier tables, score breakdowns, the error taxonomy, and the
//! [`traits::SignalSource`] / [`traits::ScoreStore`] seams that the engine
//! crate drives.

pub mod constants;
pub mod error;
pub mod tier;
pub mod traits;
pub mod types;
pub mod weights;

pub use error::{ConfigError, EngineError, SignalError, StoreError, TierError};
pub use tier::{Tier, TierTable};
pub use types::{
    BatchSummary, FactorBreakdown, FactorScore, IdPage, InfluencerId, ScoreBreakdown,
    ScoreRecord, SignalSet,
};
pub use weights::{Factor, FactorWeights, ResponseCurve, ScoringParams, WeightConfig, WeightSnapshot};
