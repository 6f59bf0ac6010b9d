//! Parallel exact-match search over a fixed group of workers.
//!
//! Each worker runs the same pipeline, strictly in order:
//!
//! 1. The coordinator validates the input and builds a [`ShardPlan`]
//! 2. Pattern and plan are broadcast, then the input is scattered
//! 3. Every worker scans its own shard with a [`ShardProcessor`]
//! 4. A barrier, then counts and offsets are gathered in rank order
//!
//! ```rust,ignore
//! let config = SearchConfig::with_workers(4)?;
//! let output = search(&config, &haystack, b"needle")?;
//! for offset in output.offsets() {
//!     println!("{}", offset);
//! }
//! ```
//!
//! [`ShardPlan`]: crate::partition::ShardPlan

pub mod engine;
pub mod matcher;
pub mod processor;

pub use engine::{run_worker, search, sequential_search, CoordinatorInput};
pub use matcher::PatternMatcher;
pub use processor::ShardProcessor;
