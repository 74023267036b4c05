//! Time-delta statistics for model transitions
//!
//! When log lines carry timestamps, every observed transition records the
//! time between its source and target events. The series is summarized by
//! mode and median for export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer time deltas observed on one transition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSeries {
    deltas: Vec<i64>,
}

impl DeltaSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_delta(&mut self, delta: i64) {
        self.deltas.push(delta);
    }

    /// Drop one occurrence of `delta`; returns whether one was present
    pub fn remove_delta(&mut self, delta: i64) -> bool {
        match self.deltas.iter().position(|&d| d == delta) {
            Some(index) => {
                self.deltas.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Append every delta of `other`
    pub fn merge(&mut self, other: &DeltaSeries) {
        self.deltas.extend_from_slice(&other.deltas);
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn deltas(&self) -> &[i64] {
        &self.deltas
    }

    /// Most frequent delta; ties go to the smallest value
    pub fn mode(&self) -> Option<i64> {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for &delta in &self.deltas {
            *counts.entry(delta).or_insert(0) += 1;
        }
        // max_by_key keeps the last maximum, so walk from the largest value
        counts
            .into_iter()
            .rev()
            .max_by_key(|&(_, count)| count)
            .map(|(delta, _)| delta)
    }

    /// Upper median: element `len / 2` of the sorted series
    pub fn median(&self) -> Option<i64> {
        self.percentile(50)
    }

    /// Nearest-rank percentile over the sorted series
    pub fn percentile(&self, percentile: u8) -> Option<i64> {
        if self.deltas.is_empty() {
            return None;
        }
        let mut sorted = self.deltas.clone();
        sorted.sort_unstable();
        let index = (sorted.len() * usize::from(percentile.min(100)) / 100).min(sorted.len() - 1);
        Some(sorted[index])
    }

    pub fn min(&self) -> Option<i64> {
        self.deltas.iter().copied().min()
    }

    pub fn max(&self) -> Option<i64> {
        self.deltas.iter().copied().max()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.deltas.is_empty() {
            return None;
        }
        let sum: f64 = self.deltas.iter().map(|&d| d as f64).sum();
        Some(sum / self.deltas.len() as f64)
    }
}

impl FromIterator<i64> for DeltaSeries {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self {
            deltas: iter.into_iter().collect(),
        }
    }
}
