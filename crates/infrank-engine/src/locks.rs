//! Per-influencer mutual exclusion.
//!
//! At most one recalculation runs for a given influencer at a time, across
//! single and fleet-wide entry points alike. Slots are created on demand and
//! removed once no holder or waiter references them, so the map stays
//! proportional to the number of in-flight recalculations.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use infrank_core::error::EngineError;
use infrank_core::types::InfluencerId;

type Slots = DashMap<InfluencerId, Arc<Mutex<()>>>;

/// Registry of per-influencer locks.
#[derive(Debug, Clone, Default)]
pub struct InfluencerLocks {
    slots: Arc<Slots>,
}

impl InfluencerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &InfluencerId) -> Arc<Mutex<()>> {
        self.slots.entry(id.clone()).or_default().value().clone()
    }

    /// Take the lock for `id` if nobody holds it.
    pub fn try_acquire(&self, id: &InfluencerId) -> Option<LockGuard> {
        match self.slot(id).try_lock_owned() {
            Ok(guard) => Some(LockGuard::new(id.clone(), Arc::clone(&self.slots), guard)),
            Err(_) => {
                release_slot(&self.slots, id);
                None
            }
        }
    }

    /// Take the lock for `id`, waiting up to `wait` for the current holder.
    ///
    /// Fails with [`EngineError::AlreadyInProgress`] when the wait elapses.
    pub async fn acquire(&self, id: &InfluencerId, wait: Duration) -> Result<LockGuard, EngineError> {
        let acquired = tokio::time::timeout(wait, self.slot(id).lock_owned()).await;
        match acquired {
            Ok(guard) => Ok(LockGuard::new(id.clone(), Arc::clone(&self.slots), guard)),
            Err(_) => {
                release_slot(&self.slots, id);
                trace!(%id, ?wait, "locks: gave up waiting");
                Err(EngineError::AlreadyInProgress(id.clone()))
            }
        }
    }

    /// Whether a recalculation currently holds `id`.
    pub fn is_locked(&self, id: &InfluencerId) -> bool {
        self.slots
            .get(id)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Number of influencers with a holder or waiter.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Drop the slot for `id` when only the registry still references it.
fn release_slot(slots: &Slots, id: &InfluencerId) {
    slots.remove_if(id, |_, slot| Arc::strong_count(slot) == 1);
}

/// Exclusive hold on one influencer. Released on drop.
#[derive(Debug)]
pub struct LockGuard {
    id: InfluencerId,
    slots: Arc<Slots>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl LockGuard {
    fn new(id: InfluencerId, slots: Arc<Slots>, guard: OwnedMutexGuard<()>) -> Self {
        Self {
            id,
            slots,
            guard: Some(guard),
        }
    }

    pub fn id(&self) -> &InfluencerId {
        &self.id
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // The guard owns a reference to the slot; release it first.
        drop(self.guard.take());
        release_slot(&self.slots, &self.id);
    }
}
