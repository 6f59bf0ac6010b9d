use tracing::{debug, error, info};

use super::matcher::PatternMatcher;
use super::processor::ShardProcessor;
use crate::collect::collect_matches;
use crate::comm::{Collective, LocalGroup, COORDINATOR};
use crate::config::SearchConfig;
use crate::distribute::{broadcast_inputs, distribute_shards};
use crate::errors::{SearchError, SearchResult};
use crate::metrics::RunMetrics;
use crate::partition::ShardPlan;
use crate::results::{GlobalResult, SearchOutput};

/// What only the coordinator holds before distribution
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorInput<'a> {
    pub haystack: &'a [u8],
    pub pattern: &'a [u8],
    /// Trailing bytes of `haystack` that are not searched
    pub exclude_trailing: usize,
}

impl<'a> CoordinatorInput<'a> {
    pub fn new(haystack: &'a [u8], pattern: &'a [u8], exclude_trailing: usize) -> Self {
        Self {
            haystack,
            pattern,
            exclude_trailing,
        }
    }

    /// Length of the searchable region, `L_raw - exclude_trailing`
    pub fn searchable_len(&self) -> SearchResult<usize> {
        self.haystack
            .len()
            .checked_sub(self.exclude_trailing)
            .ok_or(SearchError::ExcludeExceedsInput {
                exclude: self.exclude_trailing,
                len: self.haystack.len(),
            })
    }

    /// Checks the pattern against the searchable region and partitions it
    pub fn plan(&self, workers: usize) -> SearchResult<ShardPlan> {
        if self.pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        ShardPlan::new(self.searchable_len()?, self.pattern.len(), workers)
    }
}

/// Runs the full pipeline on one worker.
///
/// The coordinator passes `Some(input)` and gets back the merged result;
/// every other rank passes `None` and gets `None`. On failure the worker
/// aborts the group so no peer stays blocked in a collective.
pub fn run_worker<C: Collective>(
    comm: &mut C,
    input: Option<&CoordinatorInput<'_>>,
    metrics: &RunMetrics,
) -> SearchResult<Option<GlobalResult>> {
    let outcome = run_pipeline(comm, input, metrics);
    match &outcome {
        Ok(_) => comm.finalize(),
        Err(e) if e.is_abort() => debug!("Rank {} stopped: {}", comm.rank(), e),
        Err(e) => comm.abort(&e.to_string()),
    }
    outcome
}

fn run_pipeline<C: Collective>(
    comm: &mut C,
    input: Option<&CoordinatorInput<'_>>,
    metrics: &RunMetrics,
) -> SearchResult<Option<GlobalResult>> {
    let rank = comm.rank();

    let coordinator = if comm.is_coordinator() {
        let input = input.ok_or_else(|| {
            SearchError::config_error("coordinator started without an input sequence")
        })?;
        let plan = input.plan(comm.size())?;
        debug!("Coordinator partitioned input: sizes {:?}", plan.sizes());
        Some((input, plan))
    } else {
        None
    };

    let (pattern, plan) = broadcast_inputs(
        comm,
        coordinator
            .as_ref()
            .map(|(input, plan)| (input.pattern, plan)),
    )?;

    let shard = distribute_shards(
        comm,
        &plan,
        coordinator.as_ref().map(|(input, _)| input.haystack),
    )?;
    metrics.record_shard(rank, shard.len() as u64);

    let processor = ShardProcessor::new(PatternMatcher::new(pattern)?, metrics.clone());
    let matches = processor.process_shard(shard);
    debug!("Rank {} found {} matches", rank, matches.len());

    comm.barrier()?;
    collect_matches(comm, matches)
}

/// Searches `haystack` for `pattern` with `config.worker_count` workers.
pub fn search(config: &SearchConfig, haystack: &[u8], pattern: &[u8]) -> SearchResult<SearchOutput> {
    config.validate()?;
    let workers = config.worker_count.get();
    let input = CoordinatorInput::new(haystack, pattern, config.exclude_trailing);

    info!(
        "Starting search for a {}-byte pattern in {} bytes with {} workers",
        pattern.len(),
        haystack.len(),
        workers
    );

    let group = LocalGroup::new(workers)?;
    let metrics = RunMetrics::new();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("shardscan-worker-{}", i))
        .build()
        .map_err(|e| {
            SearchError::resource_error(format!("failed to start {} workers: {}", workers, e))
        })?;

    // Every pool thread runs the pipeline once, with its index as rank.
    let outcomes = pool.broadcast(|ctx| {
        let mut comm = group.take(ctx.index())?;
        let input = (ctx.index() == COORDINATOR).then_some(&input);
        run_worker(&mut comm, input, &metrics)
    });

    let mut result = None;
    let mut abort = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Some(global)) => result = Some(global),
            Ok(None) => {}
            Err(e) if e.is_abort() => {
                abort.get_or_insert(e);
            }
            Err(e) => {
                error!("Rank {} failed: {}", rank, e);
                return Err(e);
            }
        }
    }
    if let Some(e) = abort {
        return Err(e);
    }
    let result = result.ok_or_else(|| {
        SearchError::communication(COORDINATOR, "coordinator finished without a result")
    })?;

    metrics.log_stats();
    info!("Search complete. Found {} matches", result.len());

    Ok(SearchOutput {
        result,
        workers,
        searchable_len: input.searchable_len()?,
        stats: metrics.get_stats(),
    })
}

/// Single-threaded scan of the searchable region, without any partitioning
pub fn sequential_search(
    haystack: &[u8],
    pattern: &[u8],
    exclude_trailing: usize,
) -> SearchResult<GlobalResult> {
    let input = CoordinatorInput::new(haystack, pattern, exclude_trailing);
    let plan = input.plan(1)?;
    let matcher = PatternMatcher::new(pattern)?;
    Ok(GlobalResult::new(
        matcher.find_matches(&haystack[..plan.searchable_len()], 0),
    ))
}
