//! Result types for a sharded search run.
//!
//! A worker's [`MatchSet`] is owned by that worker until the result collector
//! moves it into the gather; only the coordinator ever holds a
//! [`GlobalResult`].

use serde::Serialize;

use crate::metrics::RunStats;

/// Ascending global offsets found by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet {
    rank: usize,
    offsets: Vec<usize>,
}

impl MatchSet {
    pub fn new(rank: usize, offsets: Vec<usize>) -> Self {
        debug_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        Self { rank, offsets }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Gives up the offsets, ending the worker's ownership
    pub fn into_offsets(self) -> Vec<usize> {
        self.offsets
    }
}

/// Every match offset of a run, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GlobalResult {
    offsets: Vec<usize>,
}

impl GlobalResult {
    pub fn new(offsets: Vec<usize>) -> Self {
        Self { offsets }
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// True when offsets are strictly increasing
    pub fn is_sorted(&self) -> bool {
        self.offsets.windows(2).all(|w| w[0] < w[1])
    }

    pub fn into_offsets(self) -> Vec<usize> {
        self.offsets
    }
}

impl From<Vec<usize>> for GlobalResult {
    fn from(offsets: Vec<usize>) -> Self {
        Self::new(offsets)
    }
}

/// Represents the complete output of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutput {
    /// Match offsets in ascending order
    pub result: GlobalResult,
    /// Number of workers that took part
    pub workers: usize,
    /// Bytes that were searched, after trailing exclusion
    pub searchable_len: usize,
    /// Counters collected from every worker
    pub stats: RunStats,
}

impl SearchOutput {
    pub fn total_matches(&self) -> usize {
        self.result.len()
    }

    pub fn offsets(&self) -> &[usize] {
        self.result.offsets()
    }
}
