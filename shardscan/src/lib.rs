pub mod collect;
pub mod comm;
pub mod config;
pub mod distribute;
pub mod errors;
pub mod metrics;
pub mod partition;
pub mod results;
pub mod search;
pub mod source;

pub use config::{ConfigOverrides, SearchConfig};
pub use errors::{ErrorKind, SearchError, SearchResult};
pub use partition::{Shard, ShardPlan};
pub use results::{GlobalResult, MatchSet, SearchOutput};
pub use search::{search, sequential_search};
pub use source::SourceBytes;
