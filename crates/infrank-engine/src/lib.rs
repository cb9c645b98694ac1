//! # infrank-engine — Recalculation orchestration.
//!
//! Composes the scoring engine with its collaborators:
//! - [`weights::WeightStore`] / [`weights::TierStore`] — versioned,
//!   atomically swapped configuration snapshots
//! - [`locks::InfluencerLocks`] — at most one recalculation per influencer
//! - [`orchestrator::Engine`] — single and fleet-wide recalculation over a
//!   bounded worker pool
//! - [`schedule`] — periodic fleet-wide recalculation
//! - [`memory`] — in-memory signal source and score store
//! - [`config::EngineConfig`] — engine configuration

pub mod cancel;
pub mod config;
pub mod locks;
pub mod memory;
pub mod orchestrator;
pub mod retry;
pub mod schedule;
pub mod weights;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::EngineConfig;
pub use locks::{InfluencerLocks, LockGuard};
pub use memory::{MemoryScoreStore, MemorySignalSource};
pub use orchestrator::Engine;
pub use retry::RetryPolicy;
pub use schedule::spawn_schedule;
pub use weights::{TierSnapshot, TierStore, WeightStore};
