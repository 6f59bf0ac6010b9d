//! Fan-out of the shared inputs and the byte sequence from the coordinator.
//!
//! Broadcast order is fixed: pattern length, pattern bytes, size table,
//! start table. The scatter that follows hands each rank its own copy of its
//! window; after it returns no worker refers to the coordinator's sequence.

use std::ops::Range;
use tracing::debug;

use crate::comm::{Collective, Payload};
use crate::errors::{SearchError, SearchResult};
use crate::partition::ShardPlan;

/// A worker's own copy of its slice of the byte sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalShard {
    rank: usize,
    start: usize,
    bytes: Vec<u8>,
}

impl LocalShard {
    pub fn new(rank: usize, start: usize, bytes: Vec<u8>) -> Self {
        Self { rank, start, bytes }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Global offset of the first byte
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Global byte range covered by this shard
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.bytes.len()
    }
}

/// Broadcasts the pattern and the shard plan.
///
/// The coordinator passes `Some((pattern, plan))`; every rank, the
/// coordinator included, gets back its own copy of both.
pub fn broadcast_inputs<C: Collective>(
    comm: &mut C,
    inputs: Option<(&[u8], &ShardPlan)>,
) -> SearchResult<(Vec<u8>, ShardPlan)> {
    let rank = comm.rank();

    let pattern_len = comm
        .broadcast(inputs.map(|(pattern, _)| Payload::Scalar(pattern.len())))?
        .into_scalar(rank)?;
    let pattern = comm
        .broadcast(inputs.map(|(pattern, _)| Payload::Bytes(pattern.to_vec())))?
        .into_bytes(rank)?;
    let sizes = comm
        .broadcast(inputs.map(|(_, plan)| Payload::Words(plan.sizes())))?
        .into_words(rank)?;
    let starts = comm
        .broadcast(inputs.map(|(_, plan)| Payload::Words(plan.starts())))?
        .into_words(rank)?;

    if pattern.len() != pattern_len {
        return Err(SearchError::communication(
            rank,
            format!(
                "pattern length {} does not match {} received bytes",
                pattern_len,
                pattern.len()
            ),
        ));
    }

    let plan = match inputs {
        Some((_, plan)) => plan.clone(),
        None => ShardPlan::from_tables(&sizes, &starts, pattern_len)?,
    };
    if plan.workers() != comm.size() {
        return Err(SearchError::invalid_plan(format!(
            "plan has {} shards for {} workers",
            plan.workers(),
            comm.size()
        )));
    }

    debug!(
        "Rank {} received a {}-byte pattern and a {}-shard plan",
        rank,
        pattern.len(),
        plan.workers()
    );
    Ok((pattern, plan))
}

/// Scatters each rank's window of `data` into a [`LocalShard`].
///
/// Only the coordinator passes `Some(data)`.
pub fn distribute_shards<C: Collective>(
    comm: &mut C,
    plan: &ShardPlan,
    data: Option<&[u8]>,
) -> SearchResult<LocalShard> {
    let rank = comm.rank();
    let windows: Vec<Range<usize>> = (0..plan.workers()).map(|r| plan.window(r)).collect();

    let bytes = match data {
        Some(data) => {
            if data.len() < plan.searchable_len() {
                return Err(SearchError::invalid_plan(format!(
                    "plan covers {} bytes but only {} were supplied",
                    plan.searchable_len(),
                    data.len()
                )));
            }
            let counts: Vec<usize> = windows.iter().map(|w| w.len()).collect();
            let displs: Vec<usize> = windows.iter().map(|w| w.start).collect();
            comm.scatterv(Some((data, counts.as_slice(), displs.as_slice())))?
        }
        None => comm.scatterv(None)?,
    };

    let window = &windows[rank];
    if bytes.len() != window.len() {
        return Err(SearchError::communication(
            rank,
            format!(
                "received {} shard bytes, expected {}",
                bytes.len(),
                window.len()
            ),
        ));
    }

    debug!("Rank {} holds bytes {:?}", rank, window);
    Ok(LocalShard::new(rank, window.start, bytes))
}
