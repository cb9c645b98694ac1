//! Engine-wide constants and defaults.
//!
//! Scoring constants are defaults only: every one of them can be overridden
//! through [`crate::weights::ScoringParams`] or the engine configuration.

// --- Scoring ---

/// Upper bound of the rating scale reviews are given on.
pub const MAX_RATING: f64 = 5.0;

/// Completed collaborations beyond this count earn nothing extra.
pub const DEFAULT_COLLAB_CAP: u64 = 10;

/// Average rating assumed for a profile with no reviews yet (scale midpoint).
pub const DEFAULT_NEUTRAL_RATING: f64 = MAX_RATING / 2.0;

/// Median response latency at which the linear response curve reaches zero.
pub const DEFAULT_RESPONSE_HORIZON_HOURS: f64 = 48.0;

// --- Default weights ---

/// Points per completed collaboration (before the cap).
pub const DEFAULT_WEIGHT_COMPLETED_COLLABORATIONS: f64 = 5.0;
/// Points for a perfect 5/5 average rating.
pub const DEFAULT_WEIGHT_AVERAGE_RATING: f64 = 100.0;
/// Points for a 100% completion rate.
pub const DEFAULT_WEIGHT_COMPLETION_RATE: f64 = 50.0;
/// Points for an instant median response.
pub const DEFAULT_WEIGHT_RESPONSE_SPEED: f64 = 30.0;
/// Flat bonus for verified profiles.
pub const DEFAULT_WEIGHT_VERIFICATION_BONUS: f64 = 50.0;
/// Points removed per penalty event.
pub const DEFAULT_WEIGHT_PENALTIES: f64 = 20.0;

// --- Default tier thresholds ---

pub const TIER_BRONZE_MIN: f64 = 0.0;
pub const TIER_SILVER_MIN: f64 = 70.0;
pub const TIER_GOLD_MIN: f64 = 140.0;
pub const TIER_PLATINUM_MIN: f64 = 210.0;

// --- Orchestration ---

/// Concurrent units of work during a fleet-wide recalculation.
pub const DEFAULT_WORKERS: usize = 8;

/// Influencer ids requested per page from the signal source.
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// Attempts (including the first) for transient upstream failures.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Base delay of the exponential retry backoff, in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 50;

/// How long an on-demand recalculation waits for a busy influencer lock.
pub const DEFAULT_LOCK_WAIT_MS: u64 = 2_000;

/// Interval between scheduled fleet-wide recalculations.
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 3_600;
