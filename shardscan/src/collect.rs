//! Two-stage gather of every worker's matches into the coordinator.
//!
//! Counts are gathered first so the coordinator can size one buffer and give
//! each rank a displacement; the offsets then land in rank order. Claimed
//! ranges are disjoint and increase with rank, so the buffer is already sorted.

use tracing::debug;

use crate::comm::Collective;
use crate::errors::SearchResult;
use crate::results::{GlobalResult, MatchSet};

/// Displacement of each rank's block in the gather buffer
pub fn gather_displacements(counts: &[usize]) -> Vec<usize> {
    let mut displs = Vec::with_capacity(counts.len());
    let mut next = 0;
    for &count in counts {
        displs.push(next);
        next += count;
    }
    displs
}

/// Moves `matches` into the gather. Returns the merged result on the
/// coordinator and `None` everywhere else.
pub fn collect_matches<C: Collective>(
    comm: &mut C,
    matches: MatchSet,
) -> SearchResult<Option<GlobalResult>> {
    let rank = comm.rank();
    let counts = comm.gather(matches.len())?;

    match counts {
        Some(counts) => {
            let displs = gather_displacements(&counts);
            debug!(
                "Coordinator gathering {} offsets with counts {:?}",
                counts.iter().sum::<usize>(),
                counts
            );
            let offsets = comm.gatherv(
                matches.into_offsets(),
                Some((counts.as_slice(), displs.as_slice())),
            )?;
            let result = offsets.map(GlobalResult::new);
            debug_assert!(result.as_ref().map_or(true, GlobalResult::is_sorted));
            Ok(result)
        }
        None => {
            debug!("Rank {} sending {} offsets", rank, matches.len());
            comm.gatherv(matches.into_offsets(), None)?;
            Ok(None)
        }
    }
}
