use std::collections::VecDeque;

use crate::sample::Sample;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Sliding window of the most recent samples.
///
/// Appends go to the back; once full, each append evicts exactly one sample
/// from the front. Callers only get shared borrows or owned copies.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl TelemetryBuffer {
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the evicted sample, if any.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}
