//! Recalculation orchestration.
//!
//! The [`Engine`] wires a [`SignalSource`], a [`ScoreStore`] and a
//! [`ScoreCalculator`] together with the versioned weight and tier stores.
//! Every unit of work:
//!
//! 1. holds the influencer's lock for its whole duration,
//! 2. snapshots weights and tiers once,
//! 3. fetches signals (retrying transient failures),
//! 4. scores and classifies,
//! 5. replaces the stored record as a whole.
//!
//! Fleet-wide recalculation pages through the population lazily and runs
//! units on a bounded pool of tokio tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use infrank_core::error::{EngineError, SignalError};
use infrank_core::tier::{Tier, TierTable};
use infrank_core::traits::{ScoreCalculator, ScoreStore, SignalSource};
use infrank_core::types::{BatchSummary, IdPage, InfluencerId, ScoreBreakdown, ScoreRecord};
use infrank_core::weights::{WeightConfig, WeightSnapshot};
use infrank_scoring::engine::ScoringEngine;
use infrank_scoring::ranking::{Leaderboard, RankedEntry};

use crate::cancel::CancelSignal;
use crate::config::EngineConfig;
use crate::locks::InfluencerLocks;
use crate::retry::RetryPolicy;
use crate::weights::{TierSnapshot, TierStore, WeightStore};

type UnitResult = (InfluencerId, Result<ScoreRecord, EngineError>);

/// The scoring engine service.
pub struct Engine {
    source: Arc<dyn SignalSource>,
    store: Arc<dyn ScoreStore>,
    calculator: Arc<dyn ScoreCalculator>,
    weights: WeightStore,
    tiers: TierStore,
    locks: InfluencerLocks,
    retry: RetryPolicy,
    config: EngineConfig,
}

impl Engine {
    /// Engine with default weights, default tiers and the standard formula.
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn SignalSource>,
        store: Arc<dyn ScoreStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            store,
            calculator: Arc::new(ScoringEngine::new()),
            weights: WeightStore::default(),
            tiers: TierStore::default(),
            locks: InfluencerLocks::new(),
            retry: RetryPolicy::from_config(&config),
            config,
        })
    }

    /// Engine with the standard formula and the given initial configuration.
    pub fn with_scoring(
        config: EngineConfig,
        source: Arc<dyn SignalSource>,
        store: Arc<dyn ScoreStore>,
        weights: WeightConfig,
        tiers: TierTable,
    ) -> Result<Arc<Self>, EngineError> {
        Self::from_parts(
            config,
            source,
            store,
            Arc::new(ScoringEngine::new()),
            weights,
            tiers,
        )
    }

    /// Engine with a custom calculator.
    pub fn from_parts(
        config: EngineConfig,
        source: Arc<dyn SignalSource>,
        store: Arc<dyn ScoreStore>,
        calculator: Arc<dyn ScoreCalculator>,
        weights: WeightConfig,
        tiers: TierTable,
    ) -> Result<Arc<Self>, EngineError> {
        Ok(Arc::new(Self {
            source,
            store,
            calculator,
            weights: WeightStore::new(weights)?,
            tiers: TierStore::new(tiers),
            locks: InfluencerLocks::new(),
            retry: RetryPolicy::from_config(&config),
            config,
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Influencers currently locked by a running (or waiting) recalculation.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    pub fn is_recalculating(&self, id: &InfluencerId) -> bool {
        self.locks.is_locked(id)
    }

    // --- Configuration ---

    pub fn get_weights(&self) -> Arc<WeightSnapshot> {
        self.weights.current()
    }

    /// Publish a new weight configuration; returns its version.
    ///
    /// Units already running keep the snapshot they started with.
    pub fn update_weights(&self, config: WeightConfig) -> Result<u64, EngineError> {
        Ok(self.weights.replace(config)?)
    }

    pub fn get_tiers(&self) -> Arc<TierSnapshot> {
        self.tiers.current()
    }

    pub fn update_tiers(&self, tiers: Vec<Tier>) -> Result<u64, EngineError> {
        Ok(self.tiers.replace(tiers)?)
    }

    // --- Reads ---

    /// Most recently persisted record for `id`.
    pub async fn get_record(&self, id: &InfluencerId) -> Result<ScoreRecord, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    /// Most recently persisted breakdown for `id`; does not recompute.
    pub async fn get_breakdown(&self, id: &InfluencerId) -> Result<ScoreBreakdown, EngineError> {
        Ok(self.get_record(id).await?.breakdown)
    }

    /// Best `limit` persisted scores, highest first.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<RankedEntry>, EngineError> {
        let page_size = self.config.page_size.max(1);
        let store = &*self.store;
        let mut board = Leaderboard::new(limit);
        let mut after: Option<InfluencerId> = None;
        loop {
            let cursor = after.clone();
            let subject = after.as_ref().map_or(String::new(), |a| a.to_string());
            let page = self
                .retry
                .run("list_scores", &subject, move || {
                    let cursor = cursor.clone();
                    async move { store.list(cursor, page_size).await.map_err(EngineError::from) }
                })
                .await?;
            for record in &page {
                board.offer(&record.breakdown);
            }
            match page.last() {
                Some(last) if page.len() == page_size => {
                    after = Some(last.influencer_id().clone());
                }
                _ => break,
            }
        }
        Ok(board.finish())
    }

    // --- Recalculation ---

    /// Recompute and persist the score of one influencer.
    ///
    /// Waits up to the configured lock wait for a concurrent recalculation of
    /// the same influencer, then fails with [`EngineError::AlreadyInProgress`].
    pub async fn recalculate_one(&self, id: &InfluencerId) -> Result<ScoreBreakdown, EngineError> {
        let _guard = self.locks.acquire(id, self.config.lock_wait()).await?;
        Ok(self.compute_locked(id).await?.breakdown)
    }

    /// Like [`Engine::recalculate_one`] but fails immediately when busy.
    pub async fn try_recalculate_one(&self, id: &InfluencerId) -> Result<ScoreBreakdown, EngineError> {
        let _guard = self
            .locks
            .try_acquire(id)
            .ok_or_else(|| EngineError::AlreadyInProgress(id.clone()))?;
        Ok(self.compute_locked(id).await?.breakdown)
    }

    /// One unit of work. The caller holds the lock for `id`.
    async fn compute_locked(&self, id: &InfluencerId) -> Result<ScoreRecord, EngineError> {
        let weights = self.weights.current();
        let tiers = self.tiers.current();

        let source = &*self.source;
        let signals = self
            .retry
            .run("fetch_signals", id.as_str(), move || async move {
                source
                    .fetch_signals(id)
                    .await
                    .map_err(|e| EngineError::from_signal(id, e))
            })
            .await?;

        let breakdown = self
            .calculator
            .breakdown(id, &signals, &weights, &tiers.table)
            .map_err(|e| EngineError::from_signal(id, e))?;
        let record = ScoreRecord::new(breakdown);

        let store = &*self.store;
        let pending = &record;
        self.retry
            .run("put_score", id.as_str(), move || {
                let record = pending.clone();
                async move { store.put(record).await.map_err(EngineError::from) }
            })
            .await?;

        debug!(
            %id,
            total = record.breakdown.total_score,
            tier = %record.breakdown.ranking_tier,
            weights_version = weights.version,
            tiers_version = tiers.version,
            "recalculate: stored score"
        );
        Ok(record)
    }

    /// Recompute every influencer the source lists.
    ///
    /// Each listed id is processed at most once. Ids locked by a concurrent
    /// recalculation are skipped and reported. Failures of single units are
    /// logged and counted without stopping the run. Cancelling `cancel`
    /// stops listing, aborts outstanding units and releases their locks.
    pub async fn recalculate_all(self: &Arc<Self>, mut cancel: CancelSignal) -> BatchSummary {
        let started = Instant::now();
        let workers = self.config.workers.max(1);
        let page_size = self.config.page_size.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks: JoinSet<UnitResult> = JoinSet::new();
        let mut units: HashMap<Id, InfluencerId> = HashMap::new();
        let mut summary = BatchSummary::default();
        let mut cursor: Option<InfluencerId> = None;
        let mut last_seen: Option<InfluencerId> = None;

        info!(workers, page_size, "recalculate_all: starting");

        'pages: loop {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                page = self.list_page(cursor.clone(), page_size) => page,
            };
            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    error!(error = %err, cursor = ?cursor, "recalculate_all: listing failed, stopping");
                    summary.list_error = Some(err.to_string());
                    break;
                }
            };

            for id in page.ids {
                if last_seen.as_ref().is_some_and(|last| &id <= last) {
                    warn!(%id, "recalculate_all: id listed out of order, skipping");
                    continue;
                }
                last_seen = Some(id.clone());

                while let Some(joined) = tasks.try_join_next_with_id() {
                    tally(&mut summary, &mut units, joined);
                }

                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        summary.cancelled = true;
                        break 'pages;
                    }
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break 'pages,
                    },
                };

                let Some(guard) = self.locks.try_acquire(&id) else {
                    debug!(%id, "recalculate_all: recalculation already running, skipping");
                    summary.skipped_ids.push(id);
                    continue;
                };

                let engine = Arc::clone(self);
                let unit = id.clone();
                let handle = tasks.spawn(async move {
                    let _permit = permit;
                    let _guard = guard;
                    let result = engine.compute_locked(&id).await;
                    (id, result)
                });
                units.insert(handle.id(), unit);
            }

            match page.next {
                Some(next) if cursor.as_ref().is_some_and(|c| &next <= c) => {
                    error!(%next, "recalculate_all: listing cursor did not advance, stopping");
                    summary.list_error = Some(format!("listing cursor did not advance past {next}"));
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if summary.cancelled {
            tasks.abort_all();
        }
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled(), if !summary.cancelled => {
                    summary.cancelled = true;
                    tasks.abort_all();
                    continue;
                }
                joined = tasks.join_next_with_id() => joined,
            };
            match joined {
                Some(joined) => tally(&mut summary, &mut units, joined),
                None => break,
            }
        }
        summary.failed_ids.sort();

        info!(
            processed = summary.processed,
            failed = summary.failed,
            skipped = summary.skipped_ids.len(),
            cancelled = summary.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recalculate_all: finished"
        );
        summary
    }

    async fn list_page(&self, after: Option<InfluencerId>, limit: usize) -> Result<IdPage, EngineError> {
        let source = &*self.source;
        let subject = after.as_ref().map_or(String::new(), |a| a.to_string());
        self.retry
            .run("list_ids", &subject, move || {
                let after = after.clone();
                async move {
                    source
                        .list_ids(after.clone(), limit)
                        .await
                        .map_err(|e| listing_error(after.as_ref(), e))
                }
            })
            .await
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("weights_version", &self.weights.current().version)
            .field("tiers_version", &self.tiers.current().version)
            .field("in_flight", &self.locks.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Map a listing failure; invalid pages are attributed to the cursor.
fn listing_error(after: Option<&InfluencerId>, err: SignalError) -> EngineError {
    let cursor = after.cloned().unwrap_or_else(|| InfluencerId::new(""));
    EngineError::from_signal(&cursor, err)
}

/// Fold one finished unit into the summary. `units` maps each spawned task
/// to its influencer so panicked units are reported by id as well.
fn tally(
    summary: &mut BatchSummary,
    units: &mut HashMap<Id, InfluencerId>,
    joined: Result<(Id, UnitResult), JoinError>,
) {
    match joined {
        Ok((task, (_, Ok(_)))) => {
            units.remove(&task);
            summary.processed += 1;
        }
        Ok((task, (id, Err(err)))) => {
            units.remove(&task);
            warn!(%id, error = %err, "recalculate_all: unit failed");
            summary.failed += 1;
            summary.failed_ids.push(id);
        }
        Err(err) => {
            let unit = units.remove(&err.id());
            if err.is_cancelled() {
                return;
            }
            error!(id = ?unit, error = %err, "recalculate_all: unit panicked");
            summary.failed += 1;
            summary.failed_ids.extend(unit);
        }
    }
}
