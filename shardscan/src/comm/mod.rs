//! Blocking collective operations over a fixed group of workers.
//!
//! Every worker holds one endpoint and calls the same sequence of collectives
//! in the same order. Rank [`COORDINATOR`] is the root of every operation:
//! it is the source of broadcasts and scatters and the destination of gathers.
//!
//! Any failure is fatal for the whole group. A worker that cannot continue
//! calls [`Collective::abort`], after which every blocked or future receive on
//! every other endpoint returns [`SearchError::Aborted`].
//!
//! [`SearchError::Aborted`]: crate::errors::SearchError::Aborted

pub mod local;

pub use local::{ChannelComm, LocalGroup};

use crate::errors::{SearchError, SearchResult};

/// Rank that owns the input and materializes the result
pub const COORDINATOR: usize = 0;

/// A value carried by one collective message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Scalar(usize),
    Bytes(Vec<u8>),
    Words(Vec<usize>),
    Token,
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Scalar(_) => "scalar",
            Payload::Bytes(_) => "bytes",
            Payload::Words(_) => "words",
            Payload::Token => "token",
        }
    }

    pub fn into_scalar(self, rank: usize) -> SearchResult<usize> {
        match self {
            Payload::Scalar(v) => Ok(v),
            other => Err(unexpected(rank, "scalar", &other)),
        }
    }

    pub fn into_bytes(self, rank: usize) -> SearchResult<Vec<u8>> {
        match self {
            Payload::Bytes(v) => Ok(v),
            other => Err(unexpected(rank, "bytes", &other)),
        }
    }

    pub fn into_words(self, rank: usize) -> SearchResult<Vec<usize>> {
        match self {
            Payload::Words(v) => Ok(v),
            other => Err(unexpected(rank, "words", &other)),
        }
    }
}

fn unexpected(rank: usize, wanted: &str, got: &Payload) -> SearchError {
    SearchError::communication(
        rank,
        format!("expected a {} payload, received {}", wanted, got.kind()),
    )
}

/// Collective operations rooted at [`COORDINATOR`].
///
/// Arguments that only the coordinator can supply are `Option`s: the
/// coordinator passes `Some`, every other rank passes `None`.
pub trait Collective {
    /// This endpoint's rank in `[0, size)`
    fn rank(&self) -> usize;

    /// Number of workers in the group
    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }

    /// Sends the coordinator's `value` to every rank and returns it everywhere.
    fn broadcast(&mut self, value: Option<Payload>) -> SearchResult<Payload>;

    /// Delivers `data[displs[i]..displs[i] + counts[i]]` to rank `i`.
    fn scatterv(&mut self, send: Option<(&[u8], &[usize], &[usize])>) -> SearchResult<Vec<u8>>;

    /// Collects one value per rank at the coordinator, in rank order.
    fn gather(&mut self, value: usize) -> SearchResult<Option<Vec<usize>>>;

    /// Places each rank's `send` at `displs[rank]` of one coordinator buffer
    /// holding `Σ counts` elements. Takes ownership of the sender's values.
    fn gatherv(
        &mut self,
        send: Vec<usize>,
        recv: Option<(&[usize], &[usize])>,
    ) -> SearchResult<Option<Vec<usize>>>;

    /// Blocks until every rank has reached the barrier.
    fn barrier(&mut self) -> SearchResult<()>;

    /// Tells every other rank the run cannot complete.
    fn abort(&mut self, reason: &str);

    /// Marks the protocol as complete for this endpoint.
    fn finalize(&mut self);
}
