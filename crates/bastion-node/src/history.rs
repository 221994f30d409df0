//! Bounded sample history.

use std::collections::VecDeque;

/// A fixed-capacity, oldest-evicted sequence of performance samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct History {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl History {
    /// Create an empty history holding at most `capacity` samples.
    ///
    /// A zero capacity is bumped to one so the buffer can always hold the
    /// latest sample.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when full.
    /// Returns the evicted sample, if any.
    pub fn push(&mut self, sample: f64) -> Option<f64> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Maximum number of samples retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Copy the samples out, oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Drop every sample, keeping the capacity.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
