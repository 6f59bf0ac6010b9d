//! Error types for shardscan.
//!
//! Every error is fatal for the run: the collective protocol needs every worker
//! in every phase, so a failure on one worker aborts the whole group and the
//! run reports the error that started it.
//!
//! ```rust,ignore
//! match shardscan::search(&config, &haystack, b"needle") {
//!     Ok(output) => // Render output.offsets,
//!     Err(e) if e.kind() == ErrorKind::Configuration => // Fix the input and re-run,
//!     Err(e) => // Report and exit non-zero
//! }
//! ```

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Broad classes of failure, used to decide exit codes and log wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resource,
    Io,
    Communication,
}

/// Errors that can occur during a sharded search run
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: pattern must not be empty")]
    EmptyPattern,
    #[error("Pattern is larger than the searchable input: pattern is {pattern_len} bytes, searchable length is {searchable_len} bytes")]
    PatternTooLong {
        pattern_len: usize,
        searchable_len: usize,
    },
    #[error("Invalid worker count: {0}")]
    InvalidWorkerCount(usize),
    #[error("Cannot exclude {exclude} trailing bytes from an input of {len} bytes")]
    ExcludeExceedsInput { exclude: usize, len: usize },
    #[error("Invalid shard plan: {0}")]
    InvalidPlan(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),
    #[error("Resource error: {0}")]
    ResourceError(String),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Communication error on rank {rank}: {message}")]
    Communication { rank: usize, message: String },
    #[error("Run aborted by rank {rank}: {reason}")]
    Aborted { rank: usize, reason: String },
}

impl SearchError {
    pub fn pattern_too_long(pattern_len: usize, searchable_len: usize) -> Self {
        Self::PatternTooLong {
            pattern_len,
            searchable_len,
        }
    }

    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Self::InvalidPlan(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn resource_error(msg: impl Into<String>) -> Self {
        Self::ResourceError(msg.into())
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn communication(rank: usize, message: impl Into<String>) -> Self {
        Self::Communication {
            rank,
            message: message.into(),
        }
    }

    pub fn aborted(rank: usize, reason: impl Into<String>) -> Self {
        Self::Aborted {
            rank,
            reason: reason.into(),
        }
    }

    /// Wraps a failed buffer reservation, naming the buffer that could not be allocated
    pub fn allocation(what: &str, len: usize, source: TryReserveError) -> Self {
        Self::ResourceError(format!(
            "failed to allocate {} ({} elements): {}",
            what, len, source
        ))
    }

    /// Classifies this error into one of the broad failure classes
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyPattern
            | Self::PatternTooLong { .. }
            | Self::InvalidWorkerCount(_)
            | Self::ExcludeExceedsInput { .. }
            | Self::InvalidPlan(_)
            | Self::ConfigError(_)
            | Self::ConfigLoad(_) => ErrorKind::Configuration,
            Self::ResourceError(_) => ErrorKind::Resource,
            Self::FileNotFound(_) | Self::PermissionDenied(_) | Self::IoError(_) => ErrorKind::Io,
            Self::Communication { .. } | Self::Aborted { .. } => ErrorKind::Communication,
        }
    }

    /// True for the secondary error a worker sees when some other worker aborted the run
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Allocates an empty buffer able to hold `len` elements, reporting failure
/// as a resource error instead of aborting the process.
pub(crate) fn try_with_capacity<T>(what: &str, len: usize) -> SearchResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|e| SearchError::allocation(what, len, e))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SearchError::pattern_too_long(10, 4);
        assert!(matches!(
            err,
            SearchError::PatternTooLong {
                pattern_len: 10,
                searchable_len: 4
            }
        ));

        let err = SearchError::file_not_found("input.bin");
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::aborted(2, "boom");
        assert!(err.is_abort());
        assert!(!SearchError::EmptyPattern.is_abort());
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::pattern_too_long(5, 3);
        assert_eq!(
            err.to_string(),
            "Pattern is larger than the searchable input: pattern is 5 bytes, searchable length is 3 bytes"
        );

        let err = SearchError::config_error("Missing required field");
        assert_eq!(err.to_string(), "Configuration error: Missing required field");

        let err = SearchError::communication(3, "peer disconnected");
        assert_eq!(
            err.to_string(),
            "Communication error on rank 3: peer disconnected"
        );

        let err = SearchError::aborted(1, "out of memory");
        assert_eq!(err.to_string(), "Run aborted by rank 1: out of memory");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(SearchError::EmptyPattern.kind(), ErrorKind::Configuration);
        assert_eq!(
            SearchError::InvalidWorkerCount(0).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            SearchError::resource_error("no memory").kind(),
            ErrorKind::Resource
        );
        assert_eq!(
            SearchError::permission_denied("/root/secret").kind(),
            ErrorKind::Io
        );
        assert_eq!(
            SearchError::aborted(0, "stop").kind(),
            ErrorKind::Communication
        );
    }

    #[test]
    fn test_allocation_error_message() {
        let source = Vec::<u8>::new().try_reserve_exact(usize::MAX).unwrap_err();
        let err = SearchError::allocation("shard buffer", usize::MAX, source);
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.to_string().starts_with("Resource error: failed to allocate shard buffer"));

        assert!(try_with_capacity::<usize>("result buffer", usize::MAX).is_err());
        assert!(try_with_capacity::<u8>("shard buffer", 16).unwrap().capacity() >= 16);
    }
}
