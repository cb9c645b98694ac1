//! Leaderboard ranking over computed breakdowns.
//!
//! [`Leaderboard`] keeps only the best `limit` entries seen so far in a
//! min-heap, so ranking a population streamed page by page needs memory
//! proportional to `limit`, not to the population.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::Serialize;

use infrank_core::types::{InfluencerId, ScoreBreakdown};

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    /// 1-based competition rank: equal scores share a rank.
    pub rank: usize,
    pub influencer_id: InfluencerId,
    pub total_score: f64,
    pub ranking_tier: String,
}

/// Higher score wins; among equal scores the smaller id wins.
type Key = (OrderedFloat<f64>, Reverse<InfluencerId>, String);

/// Bounded top-N accumulator.
#[derive(Debug)]
pub struct Leaderboard {
    limit: usize,
    heap: BinaryHeap<Reverse<Key>>,
}

impl Leaderboard {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.saturating_add(1).min(4_096)),
        }
    }

    /// Consider one breakdown for a place on the board.
    pub fn offer(&mut self, breakdown: &ScoreBreakdown) {
        if self.limit == 0 {
            return;
        }
        let key: Key = (
            OrderedFloat(breakdown.total_score),
            Reverse(breakdown.influencer_id.clone()),
            breakdown.ranking_tier.clone(),
        );
        if self.heap.len() < self.limit {
            self.heap.push(Reverse(key));
            return;
        }
        let beats_worst = self
            .heap
            .peek()
            .is_some_and(|Reverse(worst)| (&key.0, &key.1) > (&worst.0, &worst.1));
        if beats_worst {
            self.heap.pop();
            self.heap.push(Reverse(key));
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Entries best first.
    pub fn finish(self) -> Vec<RankedEntry> {
        // Ascending order of Reverse<Key> is descending order of Key.
        let ordered = self.heap.into_sorted_vec();
        let mut entries: Vec<RankedEntry> = Vec::with_capacity(ordered.len());
        for (index, Reverse((score, Reverse(id), tier))) in ordered.into_iter().enumerate() {
            let rank = match entries.last() {
                Some(prev) if prev.total_score == score.0 => prev.rank,
                _ => index + 1,
            };
            entries.push(RankedEntry {
                rank,
                influencer_id: id,
                total_score: score.0,
                ranking_tier: tier,
            });
        }
        entries
    }
}

/// Rank `breakdowns` and keep the best `limit`.
pub fn rank<'a>(
    breakdowns: impl IntoIterator<Item = &'a ScoreBreakdown>,
    limit: usize,
) -> Vec<RankedEntry> {
    let mut board = Leaderboard::new(limit);
    for b in breakdowns {
        board.offer(b);
    }
    board.finish()
}
