use tracing::trace;

use super::matcher::PatternMatcher;
use crate::distribute::LocalShard;
use crate::metrics::RunMetrics;
use crate::results::MatchSet;

/// Scans one worker's local shard for the broadcast pattern
#[derive(Debug)]
pub struct ShardProcessor {
    matcher: PatternMatcher,
    metrics: RunMetrics,
}

impl ShardProcessor {
    /// Creates a new ShardProcessor sharing the run's metrics
    pub fn new(matcher: PatternMatcher, metrics: RunMetrics) -> Self {
        Self { matcher, metrics }
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Gets the run metrics
    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Searches `shard` and releases it.
    ///
    /// Candidate starts run from 0 to `len - M`, so a non-final shard stops
    /// at the end of its base allocation and its lookahead bytes only ever
    /// complete a match, never start one.
    pub fn process_shard(&self, shard: LocalShard) -> MatchSet {
        let positions = self.matcher.candidates(shard.len());
        trace!(
            "Rank {} scanning {} bytes at offset {} ({} candidate starts)",
            shard.rank(),
            shard.len(),
            shard.start(),
            positions
        );

        let offsets = self.matcher.find_matches(shard.bytes(), shard.start());
        self.metrics
            .record_scan(positions as u64, offsets.len() as u64);
        MatchSet::new(shard.rank(), offsets)
    }
}
