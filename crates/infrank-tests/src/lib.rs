//! Integration test suite for infrank.
//!
//! Exercises the engine end to end over the in-memory collaborators:
//! per-influencer serialization, fleet-wide batches under failures and
//! cancellation, configuration swaps during recalculation, and formula
//! properties across crates.

pub mod helpers;
