//! Bounded, insertion-sorted result list.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::fact::Fact;
use crate::similarity::ScoreVector;

/// A scored result as kept by the ranking stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub scores: ScoreVector,
    /// Normalized value, used as the first tie-breaker.
    pub value: String,
    pub overlap: Vec<(usize, usize)>,
    pub fact: Arc<Fact>,
}

impl RankedEntry {
    /// Rank order: `Less` means `self` ranks before `other`.
    ///
    /// Higher scores first; ties fall back to the normalized value, the
    /// overlap ranges and finally the fact itself, all ascending.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .scores
            .compare(&self.scores)
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| self.overlap.cmp(&other.overlap))
            .then_with(|| self.fact.cmp(&other.fact))
    }
}

/// At most `capacity` entries in rank order.
#[derive(Debug, Clone)]
pub struct TopK {
    capacity: usize,
    entries: Vec<RankedEntry>,
}

impl TopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// The entry a newcomer has to beat, once the list is full.
    pub fn threshold(&self) -> Option<&RankedEntry> {
        if self.is_full() {
            self.entries.last()
        } else {
            None
        }
    }

    /// Insert `entry` at its rank position. Returns false (and leaves the
    /// list untouched) when the list is full and `entry` does not rank
    /// strictly before the last entry.
    pub fn insert(&mut self, entry: RankedEntry) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if let Some(last) = self.threshold() {
            if entry.rank_cmp(last) != Ordering::Less {
                return false;
            }
        }
        let at = self
            .entries
            .partition_point(|e| e.rank_cmp(&entry) != Ordering::Greater);
        self.entries.insert(at, entry);
        self.entries.truncate(self.capacity);
        true
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
