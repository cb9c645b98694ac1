//! Shared helpers for integration tests.

use std::sync::Arc;

use infrank_core::types::{InfluencerId, SignalSet};
use infrank_engine::{Engine, EngineConfig, MemoryScoreStore, MemorySignalSource};

/// Signals of the documented worked example (total 256.25 under defaults).
pub fn worked_example() -> SignalSet {
    SignalSet {
        completed_collaborations: 12,
        total_collaborations: 15,
        rating_sum: 45.0,
        rating_count: 10,
        median_response_hours: 6.0,
        is_verified: true,
        penalty_count: 0,
    }
}

/// Zero-padded id so lexical and numeric order agree.
pub fn inf(i: usize) -> InfluencerId {
    InfluencerId::new(format!("inf-{i:05}"))
}

/// Engine settings tuned for fast tests: short retry delay and lock wait.
pub fn test_config(workers: usize) -> EngineConfig {
    EngineConfig {
        workers,
        page_size: 16,
        retry_attempts: 3,
        retry_base_delay_ms: 1,
        lock_wait_ms: 5_000,
        ..EngineConfig::default()
    }
}

/// A population of `n` influencers with varied signals.
pub fn population(n: usize) -> MemorySignalSource {
    let source = MemorySignalSource::new();
    for i in 0..n {
        let total = 5 + (i as u64 % 20);
        source.insert(
            inf(i),
            SignalSet {
                completed_collaborations: total - (i as u64 % 5),
                total_collaborations: total,
                rating_sum: (i % 50) as f64 / 10.0 * 4.0,
                rating_count: 4,
                median_response_hours: (i % 72) as f64,
                is_verified: i % 3 == 0,
                penalty_count: (i % 7 == 0) as u64,
            },
        );
    }
    source
}

/// Engine over a fresh population of `n` and an empty store.
pub fn engine_with(
    n: usize,
    workers: usize,
) -> (Arc<Engine>, Arc<MemorySignalSource>, Arc<MemoryScoreStore>) {
    let source = Arc::new(population(n));
    let store = Arc::new(MemoryScoreStore::new());
    let engine = Engine::new(test_config(workers), source.clone(), store.clone());
    (engine, source, store)
}
