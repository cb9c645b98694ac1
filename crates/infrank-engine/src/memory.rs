//! In-memory [`SignalSource`] and [`ScoreStore`].
//!
//! Used by the CLI when scoring a population loaded from a file, and by
//! tests. Both support injected latency; the signal source can also inject
//! transient failures and listed-but-missing ids, and reports how many
//! fetches ran concurrently.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;

use infrank_core::error::{SignalError, StoreError};
use infrank_core::traits::{ScoreStore, SignalSource};
use infrank_core::types::{IdPage, InfluencerId, ScoreRecord, SignalSet};

/// Keys of `map` strictly greater than `after`, at most `limit`.
fn page_after<'a, V>(
    map: &'a BTreeMap<InfluencerId, V>,
    after: Option<&InfluencerId>,
    limit: usize,
) -> impl Iterator<Item = (&'a InfluencerId, &'a V)> {
    let lower = match after {
        Some(id) => Bound::Excluded(id.clone()),
        None => Bound::Unbounded,
    };
    map.range((lower, Bound::Unbounded)).take(limit)
}

// ---------------------------------------------------------------------------
// Signal source
// ---------------------------------------------------------------------------

/// Signal source backed by a sorted map.
#[derive(Debug, Default)]
pub struct MemorySignalSource {
    signals: RwLock<BTreeMap<InfluencerId, SignalSet>>,
    /// Remaining injected `DataUnavailable` failures per id.
    faults: DashMap<InfluencerId, u32>,
    /// Remaining injected failures of `list_ids`.
    list_faults: AtomicU64,
    /// Ids that are listed but whose fetch reports `NotFound`.
    missing: DashSet<InfluencerId>,
    fetch_delay: RwLock<Option<Duration>>,
    fetches: AtomicU64,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MemorySignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(signals: BTreeMap<InfluencerId, SignalSet>) -> Self {
        Self {
            signals: RwLock::new(signals),
            ..Self::default()
        }
    }

    pub fn insert(&self, id: InfluencerId, signals: SignalSet) {
        self.signals.write().insert(id, signals);
    }

    pub fn remove(&self, id: &InfluencerId) -> Option<SignalSet> {
        self.signals.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.signals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.read().is_empty()
    }

    /// Make the next `times` fetches for `id` fail with `DataUnavailable`.
    pub fn fail_next(&self, id: &InfluencerId, times: u32) {
        self.faults.insert(id.clone(), times);
    }

    /// Make the next `times` listings fail with `DataUnavailable`.
    pub fn fail_next_listings(&self, times: u64) {
        self.list_faults.store(times, Ordering::SeqCst);
    }

    /// Keep `id` listed but report it as not found on fetch.
    pub fn mark_missing(&self, id: &InfluencerId) {
        self.missing.insert(id.clone());
    }

    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.write() = delay;
    }

    /// Total fetch calls, including failed ones.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn take_fault(&self, id: &InfluencerId) -> bool {
        let mut injected = false;
        self.faults.remove_if_mut(id, |_, remaining| {
            *remaining = remaining.saturating_sub(1);
            injected = true;
            *remaining == 0
        });
        injected
    }
}

/// Tracks one in-flight fetch; decrements the counter on drop so aborted
/// fetches are accounted for too.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalSource for MemorySignalSource {
    async fn fetch_signals(&self, id: &InfluencerId) -> Result<SignalSet, SignalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak);

        let delay = *self.fetch_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_fault(id) {
            return Err(SignalError::DataUnavailable(format!("injected fault for {id}")));
        }
        if self.missing.contains(id) {
            return Err(SignalError::NotFound(id.clone()));
        }
        self.signals
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SignalError::NotFound(id.clone()))
    }

    async fn list_ids(
        &self,
        after: Option<InfluencerId>,
        limit: usize,
    ) -> Result<IdPage, SignalError> {
        let injected = self
            .list_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(SignalError::DataUnavailable("injected listing fault".into()));
        }

        let map = self.signals.read();
        let ids: Vec<InfluencerId> = page_after(&map, after.as_ref(), limit)
            .map(|(id, _)| id.clone())
            .collect();
        let next = if ids.len() == limit {
            ids.last().cloned()
        } else {
            None
        };
        Ok(IdPage { ids, next })
    }
}

// ---------------------------------------------------------------------------
// Score store
// ---------------------------------------------------------------------------

/// Score store backed by a sorted map of shared records.
///
/// `put` swaps a whole `Arc<ScoreRecord>`, so concurrent readers never see a
/// partially written record.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    records: RwLock<BTreeMap<InfluencerId, Arc<ScoreRecord>>>,
    puts: AtomicU64,
    put_faults: AtomicU64,
    put_delay: RwLock<Option<Duration>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make the next `times` puts fail with `Unavailable`.
    pub fn fail_next_puts(&self, times: u64) {
        self.put_faults.store(times, Ordering::SeqCst);
    }

    pub fn set_put_delay(&self, delay: Option<Duration>) {
        *self.put_delay.write() = delay;
    }

    /// Every stored record, ascending by id.
    pub fn snapshot(&self) -> Vec<ScoreRecord> {
        self.records.read().values().map(|r| (**r).clone()).collect()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn put(&self, record: ScoreRecord) -> Result<(), StoreError> {
        let delay = *self.put_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self
            .put_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected put fault".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        let id = record.influencer_id().clone();
        self.records.write().insert(id, Arc::new(record));
        Ok(())
    }

    async fn get(&self, id: &InfluencerId) -> Result<Option<ScoreRecord>, StoreError> {
        let record = self.records.read().get(id).cloned();
        Ok(record.map(|r| (*r).clone()))
    }

    async fn list(
        &self,
        after: Option<InfluencerId>,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, StoreError> {
        let map = self.records.read();
        Ok(page_after(&map, after.as_ref(), limit)
            .map(|(_, r)| (**r).clone())
            .collect())
    }
}
