use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared by every worker of one run
#[derive(Debug, Clone)]
pub struct RunMetrics {
    // Distribution metrics
    bytes_scattered: Arc<AtomicU64>,
    largest_shard: Arc<AtomicU64>,

    // Search metrics
    shards_searched: Arc<AtomicU64>,
    positions_examined: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,
}

impl RunMetrics {
    /// Creates a new RunMetrics instance
    pub fn new() -> Self {
        Self {
            bytes_scattered: Arc::new(AtomicU64::new(0)),
            largest_shard: Arc::new(AtomicU64::new(0)),
            shards_searched: Arc::new(AtomicU64::new(0)),
            positions_examined: Arc::new(AtomicU64::new(0)),
            matches_found: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a shard delivered to a worker by the scatter
    pub fn record_shard(&self, rank: usize, bytes: u64) {
        let total = self.bytes_scattered.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let mut largest = self.largest_shard.load(Ordering::Relaxed);
        while bytes > largest {
            match self.largest_shard.compare_exchange_weak(
                largest,
                bytes,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => largest = current,
            }
        }
        debug!(
            "Rank {} received {} bytes, total scattered: {} bytes",
            rank, bytes, total
        );
    }

    /// Records the outcome of one local scan
    pub fn record_scan(&self, positions: u64, matches: u64) {
        self.shards_searched.fetch_add(1, Ordering::Relaxed);
        self.positions_examined
            .fetch_add(positions, Ordering::Relaxed);
        self.matches_found.fetch_add(matches, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> RunStats {
        RunStats {
            bytes_scattered: self.bytes_scattered.load(Ordering::Relaxed),
            largest_shard: self.largest_shard.load(Ordering::Relaxed),
            shards_searched: self.shards_searched.load(Ordering::Relaxed),
            positions_examined: self.positions_examined.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
        }
    }

    /// Logs the counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Run stats:\n\
             Bytes scattered: {} bytes\n\
             Largest shard: {} bytes\n\
             Shards searched: {}\n\
             Positions examined: {}\n\
             Matches found: {}",
            stats.bytes_scattered,
            stats.largest_shard,
            stats.shards_searched,
            stats.positions_examined,
            stats.matches_found
        );
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of one run's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunStats {
    pub bytes_scattered: u64,
    pub largest_shard: u64,
    pub shards_searched: u64,
    pub positions_examined: u64,
    pub matches_found: u64,
}
