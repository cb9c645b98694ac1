//! # infrank-scoring — Transparent weighted-sum scoring.
//!
//! Everything in this crate is pure: no I/O, no shared state, no clocks.
//!
//! - **Scoring function**: six factor contributions (capped collaborations,
//!   rating, completion rate, response speed, verification, penalties)
//!   summed and clamped to `[0, max_score]`.
//! - **Response curves**: monotone latency-to-multiplier mappings.
//! - **Tier classifier**: highest tier whose minimum the score reaches.
//! - **Ranking**: bounded top-N leaderboard over computed breakdowns.

pub mod classify;
pub mod engine;
pub mod ranking;
pub mod response;

pub use classify::{classify, classify_table, requirements_met};
pub use engine::{max_score, score_signals, ScoreComponents, ScoringEngine};
pub use ranking::{rank, Leaderboard, RankedEntry};
pub use response::response_factor;
