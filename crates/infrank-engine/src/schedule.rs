//! Periodic fleet-wide recalculation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::cancel::CancelSignal;
use crate::orchestrator::Engine;

/// Run [`Engine::recalculate_all`] every `interval` until `shutdown` fires.
///
/// The first run starts immediately. Runs never overlap: a tick that comes
/// due while a run is still going is skipped. Shutdown also cancels the run
/// in progress. The task resolves to the number of runs started.
pub fn spawn_schedule(
    engine: Arc<Engine>,
    interval: Duration,
    shutdown: CancelSignal,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = shutdown;
        let mut runs = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            runs += 1;
            let summary = engine.recalculate_all(shutdown.clone()).await;
            info!(
                run = runs,
                processed = summary.processed,
                failed = summary.failed,
                cancelled = summary.cancelled,
                "schedule: run finished"
            );
            if summary.cancelled {
                break;
            }
        }
        info!(runs, "schedule: stopped");
        runs
    })
}
