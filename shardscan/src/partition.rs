//! Overlap-aware partitioning of a byte sequence into per-worker shards.
//!
//! Each non-final shard carries `M - 1` bytes of lookahead so a match that
//! starts inside its base allocation can be validated locally, and the next
//! shard starts `M - 1` bytes earlier so the overlap is physically shared.
//! The scan bound of the local searcher keeps every worker from claiming a
//! start offset that belongs to its neighbour.

use std::ops::Range;

use crate::errors::{SearchError, SearchResult};

/// One worker's slice of the byte sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    /// Bytes assigned to the worker, including any lookahead overlap
    pub size: usize,
    /// Global offset of the shard's first byte
    pub start: usize,
}

/// Immutable per-worker size and start tables for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPlan {
    shards: Vec<Shard>,
    searchable_len: usize,
    pattern_len: usize,
}

impl ShardPlan {
    /// Partitions `searchable_len` bytes for a pattern of `pattern_len` bytes
    /// across `workers` workers.
    pub fn new(searchable_len: usize, pattern_len: usize, workers: usize) -> SearchResult<Self> {
        if pattern_len == 0 {
            return Err(SearchError::EmptyPattern);
        }
        if searchable_len < pattern_len {
            return Err(SearchError::pattern_too_long(pattern_len, searchable_len));
        }
        if workers == 0 {
            return Err(SearchError::InvalidWorkerCount(workers));
        }

        let overlap = pattern_len - 1;
        let base = searchable_len / workers;
        let mut remainder = searchable_len % workers;

        let mut sizes = Vec::with_capacity(workers);
        for rank in 0..workers {
            let mut size = base;
            if remainder > 0 {
                size += 1;
                remainder -= 1;
            }
            if rank < workers - 1 {
                size += overlap;
            }
            sizes.push(size);
        }

        let mut shards = Vec::with_capacity(workers);
        let mut start = 0;
        for (rank, &size) in sizes.iter().enumerate() {
            if rank > 0 {
                start = start + sizes[rank - 1] - overlap;
            }
            shards.push(Shard { size, start });
        }

        Ok(Self {
            shards,
            searchable_len,
            pattern_len,
        })
    }

    /// Rebuilds a plan from broadcast size and start tables, checking every
    /// invariant a locally computed plan satisfies.
    pub fn from_tables(sizes: &[usize], starts: &[usize], pattern_len: usize) -> SearchResult<Self> {
        if sizes.is_empty() {
            return Err(SearchError::invalid_plan("plan has no shards"));
        }
        if sizes.len() != starts.len() {
            return Err(SearchError::invalid_plan(format!(
                "{} sizes but {} starts",
                sizes.len(),
                starts.len()
            )));
        }
        if pattern_len == 0 {
            return Err(SearchError::EmptyPattern);
        }

        let overlap = pattern_len - 1;
        if starts[0] != 0 {
            return Err(SearchError::invalid_plan(format!(
                "first shard starts at {}",
                starts[0]
            )));
        }
        for rank in 1..sizes.len() {
            let expected = (starts[rank - 1] + sizes[rank - 1]).checked_sub(overlap);
            if expected != Some(starts[rank]) {
                return Err(SearchError::invalid_plan(format!(
                    "shard {} starts at {}, expected {:?}",
                    rank, starts[rank], expected
                )));
            }
        }

        let last = sizes.len() - 1;
        let searchable_len = starts[last] + sizes[last];
        if searchable_len < pattern_len {
            return Err(SearchError::pattern_too_long(pattern_len, searchable_len));
        }

        Ok(Self {
            shards: sizes
                .iter()
                .zip(starts)
                .map(|(&size, &start)| Shard { size, start })
                .collect(),
            searchable_len,
            pattern_len,
        })
    }

    pub fn workers(&self) -> usize {
        self.shards.len()
    }

    pub fn searchable_len(&self) -> usize {
        self.searchable_len
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern_len
    }

    /// Bytes of lookahead appended to every non-final shard
    pub fn overlap(&self) -> usize {
        self.pattern_len - 1
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn shard(&self, rank: usize) -> Option<Shard> {
        self.shards.get(rank).copied()
    }

    /// The size table, in rank order
    pub fn sizes(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.size).collect()
    }

    /// The start table, in rank order
    pub fn starts(&self) -> Vec<usize> {
        self.shards.iter().map(|s| s.start).collect()
    }

    /// Byte range delivered to `rank`.
    ///
    /// Equal to `start..start + size` unless the lookahead would run past the
    /// searchable length, which only happens when `L / W < M - 1`.
    pub fn window(&self, rank: usize) -> Range<usize> {
        let shard = self.shards[rank];
        let end = (shard.start + shard.size).min(self.searchable_len);
        shard.start..end.max(shard.start)
    }

    /// Start offsets `rank` is the sole authority to report.
    pub fn claimed_range(&self, rank: usize) -> Range<usize> {
        let shard = self.shards[rank];
        let last_start = self.searchable_len - self.pattern_len + 1;
        let end = if rank + 1 < self.shards.len() {
            shard.start + shard.size - self.overlap()
        } else {
            shard.start + shard.size
        };
        shard.start..end.min(last_start).max(shard.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_inputs() -> impl Iterator<Item = (usize, usize, usize)> {
        (1..=24).flat_map(|len| {
            (1..=len).flat_map(move |pattern_len| (1..=9).map(move |w| (len, pattern_len, w)))
        })
    }

    #[test]
    fn test_three_way_split() {
        let plan = ShardPlan::new(9, 3, 3).unwrap();
        assert_eq!(plan.sizes(), vec![5, 5, 3]);
        assert_eq!(plan.starts(), vec![0, 3, 6]);
        assert_eq!(plan.window(0), 0..5);
        assert_eq!(plan.claimed_range(0), 0..3);
        assert_eq!(plan.claimed_range(2), 6..7);
    }

    #[test]
    fn test_remainder_goes_to_lowest_ranks() {
        let plan = ShardPlan::new(10, 1, 4).unwrap();
        assert_eq!(plan.sizes(), vec![3, 3, 2, 2]);
        assert_eq!(plan.starts(), vec![0, 3, 6, 8]);
    }

    #[test]
    fn test_single_worker_has_no_overlap() {
        let plan = ShardPlan::new(100, 7, 1).unwrap();
        assert_eq!(plan.shards(), &[Shard { size: 100, start: 0 }]);
        assert_eq!(plan.window(0), 0..100);
        assert_eq!(plan.claimed_range(0), 0..94);
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            ShardPlan::new(3, 4, 2),
            Err(SearchError::PatternTooLong {
                pattern_len: 4,
                searchable_len: 3
            })
        ));
        assert!(matches!(
            ShardPlan::new(3, 0, 2),
            Err(SearchError::EmptyPattern)
        ));
        assert!(matches!(
            ShardPlan::new(3, 1, 0),
            Err(SearchError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_sizes_net_of_overlap_sum_to_length() {
        for (len, pattern_len, w) in valid_inputs() {
            let plan = ShardPlan::new(len, pattern_len, w).unwrap();
            let total: usize = plan.sizes().iter().sum();
            assert_eq!(
                total - (w - 1) * (pattern_len - 1),
                len,
                "L={} M={} W={}",
                len,
                pattern_len,
                w
            );
        }
    }

    #[test]
    fn test_start_recurrence_and_end() {
        for (len, pattern_len, w) in valid_inputs() {
            let plan = ShardPlan::new(len, pattern_len, w).unwrap();
            let shards = plan.shards();
            assert_eq!(shards[0].start, 0);
            for i in 1..w {
                assert_eq!(
                    shards[i].start,
                    shards[i - 1].start + shards[i - 1].size - (pattern_len - 1)
                );
            }
            assert_eq!(shards[w - 1].start + shards[w - 1].size, len);
        }
    }

    #[test]
    fn test_claimed_ranges_cover_every_start_once() {
        for (len, pattern_len, w) in valid_inputs() {
            let plan = ShardPlan::new(len, pattern_len, w).unwrap();
            let mut owners = vec![0usize; len - pattern_len + 1];
            for rank in 0..w {
                for offset in plan.claimed_range(rank) {
                    owners[offset] += 1;
                }
            }
            assert!(
                owners.iter().all(|&n| n == 1),
                "L={} M={} W={} owners={:?}",
                len,
                pattern_len,
                w,
                owners
            );
        }
    }

    #[test]
    fn test_claimed_ranges_are_contiguous() {
        let plan = ShardPlan::new(1000, 5, 7).unwrap();
        for i in 0..6 {
            let shard = plan.shard(i).unwrap();
            let next = plan.shard(i + 1).unwrap();
            assert_eq!(shard.start + (shard.size - 4), next.start);
            assert_eq!(plan.claimed_range(i).end, plan.claimed_range(i + 1).start);
        }
    }

    #[test]
    fn test_windows_stay_inside_searchable_length() {
        for (len, pattern_len, w) in valid_inputs() {
            let plan = ShardPlan::new(len, pattern_len, w).unwrap();
            for rank in 0..w {
                let window = plan.window(rank);
                assert!(window.end <= len);
                let claimed = plan.claimed_range(rank);
                if !claimed.is_empty() {
                    // Every claimed start must be fully verifiable inside the window.
                    assert!(claimed.end - 1 + pattern_len <= window.end);
                    assert!(claimed.start >= window.start);
                }
            }
        }
    }

    #[test]
    fn test_from_tables_round_trip_and_rejection() {
        let plan = ShardPlan::new(57, 4, 5).unwrap();
        let rebuilt = ShardPlan::from_tables(&plan.sizes(), &plan.starts(), 4).unwrap();
        assert_eq!(rebuilt, plan);

        let mut starts = plan.starts();
        starts[2] += 1;
        assert!(matches!(
            ShardPlan::from_tables(&plan.sizes(), &starts, 4),
            Err(SearchError::InvalidPlan(_))
        ));
        assert!(matches!(
            ShardPlan::from_tables(&[3, 3], &[0], 1),
            Err(SearchError::InvalidPlan(_))
        ));
    }
}
