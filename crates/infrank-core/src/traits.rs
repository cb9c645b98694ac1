//! Trait interfaces between the engine and its collaborators.
//!
//! - [`SignalSource`] — read-only aggregates from the profile, collaboration,
//!   review and verification systems
//! - [`ScoreStore`] — persistence of computed score records
//! - [`ScoreCalculator`] — the pure scoring function (infrank-scoring implements)

use async_trait::async_trait;

use crate::error::{SignalError, StoreError};
use crate::tier::TierTable;
use crate::types::{IdPage, InfluencerId, ScoreBreakdown, ScoreRecord, SignalSet};
use crate::weights::WeightSnapshot;

/// Upstream source of per-influencer signals.
///
/// Implementations must not cache: staleness policy belongs to the caller.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Current aggregates for one influencer.
    ///
    /// Fails with [`SignalError::NotFound`] for unknown ids and
    /// [`SignalError::DataUnavailable`] when the backing store cannot be
    /// reached.
    async fn fetch_signals(&self, id: &InfluencerId) -> Result<SignalSet, SignalError>;

    /// Up to `limit` ids strictly greater than `after`, in ascending order.
    ///
    /// Paging through the whole population with the returned cursor visits
    /// every id once without materializing the population.
    async fn list_ids(
        &self,
        after: Option<InfluencerId>,
        limit: usize,
    ) -> Result<IdPage, SignalError>;
}

/// Persistence for score records, keyed by influencer id.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Replace the stored record for the record's influencer as a whole.
    ///
    /// Readers must observe either the previous record or this one, never a
    /// mix of both.
    async fn put(&self, record: ScoreRecord) -> Result<(), StoreError>;

    /// Most recently stored record, if any.
    async fn get(&self, id: &InfluencerId) -> Result<Option<ScoreRecord>, StoreError>;

    /// Up to `limit` records with ids strictly greater than `after`, ascending.
    async fn list(
        &self,
        after: Option<InfluencerId>,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, StoreError>;
}

/// Pure computation of a score breakdown.
///
/// Implementations perform no I/O and hold no mutable state; the same inputs
/// always produce the same breakdown.
pub trait ScoreCalculator: Send + Sync {
    fn breakdown(
        &self,
        id: &InfluencerId,
        signals: &SignalSet,
        weights: &WeightSnapshot,
        tiers: &TierTable,
    ) -> Result<ScoreBreakdown, SignalError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Mock: SignalSource over a sorted map
    // ------------------------------------------------------------------

    struct MapSource {
        signals: BTreeMap<InfluencerId, SignalSet>,
    }

    #[async_trait]
    impl SignalSource for MapSource {
        async fn fetch_signals(&self, id: &InfluencerId) -> Result<SignalSet, SignalError> {
            self.signals
                .get(id)
                .cloned()
                .ok_or_else(|| SignalError::NotFound(id.clone()))
        }

        async fn list_ids(
            &self,
            after: Option<InfluencerId>,
            limit: usize,
        ) -> Result<IdPage, SignalError> {
            let ids: Vec<InfluencerId> = self
                .signals
                .keys()
                .filter(|id| after.as_ref().is_none_or(|a| *id > a))
                .take(limit)
                .cloned()
                .collect();
            let next = if ids.len() == limit { ids.last().cloned() } else { None };
            Ok(IdPage { ids, next })
        }
    }

    // ------------------------------------------------------------------
    // Mock: ScoreStore over a mutex-guarded map
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MapStore {
        records: Mutex<BTreeMap<InfluencerId, ScoreRecord>>,
    }

    #[async_trait]
    impl ScoreStore for MapStore {
        async fn put(&self, record: ScoreRecord) -> Result<(), StoreError> {
            let mut records = self.records.lock().unwrap();
            records.insert(record.influencer_id().clone(), record);
            Ok(())
        }

        async fn get(&self, id: &InfluencerId) -> Result<Option<ScoreRecord>, StoreError> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn list(
            &self,
            after: Option<InfluencerId>,
            limit: usize,
        ) -> Result<Vec<ScoreRecord>, StoreError> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|(id, _)| after.as_ref().is_none_or(|a| *id > a))
                .take(limit)
                .map(|(_, r)| r.clone())
                .collect())
        }
    }

    fn source(n: usize) -> MapSource {
        let signals = (0..n)
            .map(|i| (InfluencerId::new(format!("inf-{i:03}")), SignalSet::default()))
            .collect();
        MapSource { signals }
    }

    #[tokio::test]
    async fn paging_visits_every_id_once() {
        let src = source(7);
        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = src.list_ids(cursor, 3).await.unwrap();
            seen.extend(page.ids);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen.len(), 7);
        let mut sorted = seen.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, seen);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let src = source(1);
        let missing = InfluencerId::from("nobody");
        assert_eq!(
            src.fetch_signals(&missing).await,
            Err(SignalError::NotFound(missing))
        );
    }

    #[tokio::test]
    async fn store_put_replaces_whole_record() {
        use crate::types::{FactorBreakdown, ScoreBreakdown};

        let store = MapStore::default();
        let id = InfluencerId::from("inf-1");
        let breakdown = |total: f64, tier: &str| ScoreBreakdown {
            influencer_id: id.clone(),
            total_score: total,
            max_score: 280.0,
            factors: FactorBreakdown::default(),
            ranking_tier: tier.to_string(),
            requirements_met: BTreeMap::new(),
            weights_version: 1,
            weights_fingerprint: String::new(),
        };

        store.put(ScoreRecord::new(breakdown(10.0, "Bronze"))).await.unwrap();
        store.put(ScoreRecord::new(breakdown(150.0, "Gold"))).await.unwrap();

        let got = store.get(&id).await.unwrap().unwrap();
        assert_eq!(got.breakdown.total_score, 150.0);
        assert_eq!(got.breakdown.ranking_tier, "Gold");
        assert_eq!(store.list(None, 10).await.unwrap().len(), 1);
    }
}
