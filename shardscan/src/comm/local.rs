use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Mutex;
use tracing::{trace, warn};

use super::{Collective, Payload, COORDINATOR};
use crate::errors::{try_with_capacity, SearchError, SearchResult};

#[derive(Debug)]
enum Message {
    Data(Payload),
    Abort(String),
}

#[derive(Debug)]
struct Envelope {
    source: usize,
    seq: u64,
    message: Message,
}

/// A data message that arrived before the collective it belongs to
#[derive(Debug)]
struct Held {
    source: usize,
    seq: u64,
    payload: Payload,
}

/// In-process group of endpoints connected by unbounded channels
#[derive(Debug)]
pub struct LocalGroup {
    slots: Vec<Mutex<Option<ChannelComm>>>,
}

impl LocalGroup {
    /// Creates a fully connected group of `size` endpoints
    pub fn new(size: usize) -> SearchResult<Self> {
        if size == 0 {
            return Err(SearchError::InvalidWorkerCount(size));
        }

        let (senders, inboxes): (Vec<Sender<Envelope>>, Vec<Receiver<Envelope>>) =
            (0..size).map(|_| unbounded()).unzip();

        let slots = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| {
                let peers = senders
                    .iter()
                    .enumerate()
                    .map(|(dest, tx)| (dest != rank).then(|| tx.clone()))
                    .collect();
                Mutex::new(Some(ChannelComm {
                    rank,
                    size,
                    peers,
                    inbox,
                    held: Vec::new(),
                    seq: 0,
                    abort_notice: None,
                    abort_sent: false,
                    finished: false,
                }))
            })
            .collect();

        Ok(Self { slots })
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Hands out the endpoint for `rank`. Each endpoint can be taken once.
    pub fn take(&self, rank: usize) -> SearchResult<ChannelComm> {
        let slot = self
            .slots
            .get(rank)
            .ok_or_else(|| SearchError::communication(rank, "rank is outside the group"))?;
        let mut guard = slot
            .lock()
            .map_err(|_| SearchError::communication(rank, "endpoint slot is poisoned"))?;
        guard
            .take()
            .ok_or_else(|| SearchError::communication(rank, "endpoint was already taken"))
    }

    /// Consumes the group, returning every endpoint still held, in rank order
    pub fn into_endpoints(self) -> Vec<ChannelComm> {
        self.slots
            .into_iter()
            .filter_map(|slot| slot.into_inner().ok().flatten())
            .collect()
    }
}

/// One worker's endpoint in a [`LocalGroup`]
#[derive(Debug)]
pub struct ChannelComm {
    rank: usize,
    size: usize,
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    held: Vec<Held>,
    seq: u64,
    abort_notice: Option<(usize, String)>,
    abort_sent: bool,
    finished: bool,
}

impl ChannelComm {
    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn send(&self, dest: usize, seq: u64, payload: Payload) -> SearchResult<()> {
        let tx = self.peers[dest].as_ref().ok_or_else(|| {
            SearchError::communication(self.rank, format!("no channel to rank {}", dest))
        })?;
        tx.send(Envelope {
            source: self.rank,
            seq,
            message: Message::Data(payload),
        })
        .map_err(|_| {
            SearchError::communication(self.rank, format!("rank {} is no longer reachable", dest))
        })
    }

    fn recv(&mut self, source: usize, seq: u64) -> SearchResult<Payload> {
        if let Some((rank, reason)) = &self.abort_notice {
            return Err(SearchError::aborted(*rank, reason.clone()));
        }
        if let Some(pos) = self
            .held
            .iter()
            .position(|h| h.source == source && h.seq == seq)
        {
            return Ok(self.held.swap_remove(pos).payload);
        }

        loop {
            let envelope = self.inbox.recv().map_err(|_| {
                SearchError::communication(self.rank, "every peer disconnected")
            })?;
            match envelope.message {
                Message::Abort(reason) => {
                    self.abort_notice = Some((envelope.source, reason.clone()));
                    return Err(SearchError::aborted(envelope.source, reason));
                }
                Message::Data(payload) if envelope.source == source && envelope.seq == seq => {
                    return Ok(payload);
                }
                Message::Data(payload) => {
                    trace!(
                        "Rank {} holding message {} from rank {} while waiting for {}",
                        self.rank,
                        envelope.seq,
                        envelope.source,
                        seq
                    );
                    self.held.push(Held {
                        source: envelope.source,
                        seq: envelope.seq,
                        payload,
                    });
                }
            }
        }
    }

    fn require<T>(&self, value: Option<T>, what: &str) -> SearchResult<T> {
        value.ok_or_else(|| {
            SearchError::communication(self.rank, format!("coordinator must supply {}", what))
        })
    }

    fn expect_token(&self, source: usize, payload: Payload) -> SearchResult<()> {
        match payload {
            Payload::Token => Ok(()),
            other => Err(SearchError::communication(
                self.rank,
                format!("expected a barrier token from rank {}, received {:?}", source, other),
            )),
        }
    }

    fn check_table(&self, table: &[usize], name: &str) -> SearchResult<()> {
        if table.len() != self.size {
            return Err(SearchError::communication(
                self.rank,
                format!("{} table has {} entries for {} ranks", name, table.len(), self.size),
            ));
        }
        Ok(())
    }
}

impl Collective for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&mut self, value: Option<Payload>) -> SearchResult<Payload> {
        let seq = self.next_seq();
        if !self.is_coordinator() {
            return self.recv(COORDINATOR, seq);
        }

        let value = self.require(value, "the broadcast value")?;
        for dest in (0..self.size).filter(|&r| r != self.rank) {
            self.send(dest, seq, value.clone())?;
        }
        Ok(value)
    }

    fn scatterv(&mut self, send: Option<(&[u8], &[usize], &[usize])>) -> SearchResult<Vec<u8>> {
        let seq = self.next_seq();
        if !self.is_coordinator() {
            return self.recv(COORDINATOR, seq)?.into_bytes(self.rank);
        }

        let (data, counts, displs) = self.require(send, "the scatter buffers")?;
        self.check_table(counts, "count")?;
        self.check_table(displs, "displacement")?;

        let mut own = Vec::new();
        for dest in 0..self.size {
            let range = displs[dest]..displs[dest] + counts[dest];
            let slice = data.get(range.clone()).ok_or_else(|| {
                SearchError::communication(
                    self.rank,
                    format!(
                        "scatter range {:?} for rank {} exceeds {} bytes",
                        range,
                        dest,
                        data.len()
                    ),
                )
            })?;
            let mut buffer = try_with_capacity("shard buffer", slice.len())?;
            buffer.extend_from_slice(slice);
            if dest == self.rank {
                own = buffer;
            } else {
                self.send(dest, seq, Payload::Bytes(buffer))?;
            }
        }
        Ok(own)
    }

    fn gather(&mut self, value: usize) -> SearchResult<Option<Vec<usize>>> {
        let seq = self.next_seq();
        if !self.is_coordinator() {
            self.send(COORDINATOR, seq, Payload::Scalar(value))?;
            return Ok(None);
        }

        let mut values = Vec::with_capacity(self.size);
        for source in 0..self.size {
            if source == self.rank {
                values.push(value);
            } else {
                let rank = self.rank;
                values.push(self.recv(source, seq)?.into_scalar(rank)?);
            }
        }
        Ok(Some(values))
    }

    fn gatherv(
        &mut self,
        send: Vec<usize>,
        recv: Option<(&[usize], &[usize])>,
    ) -> SearchResult<Option<Vec<usize>>> {
        let seq = self.next_seq();
        if !self.is_coordinator() {
            self.send(COORDINATOR, seq, Payload::Words(send))?;
            return Ok(None);
        }

        let (counts, displs) = self.require(recv, "the gather counts")?;
        self.check_table(counts, "count")?;
        self.check_table(displs, "displacement")?;

        let total: usize = counts.iter().sum();
        let mut buffer = try_with_capacity("result buffer", total)?;
        buffer.resize(total, 0);

        let mut own = Some(send);
        for source in 0..self.size {
            let values = if source == self.rank {
                own.take().unwrap_or_default()
            } else {
                let rank = self.rank;
                self.recv(source, seq)?.into_words(rank)?
            };
            if values.len() != counts[source] {
                return Err(SearchError::communication(
                    self.rank,
                    format!(
                        "rank {} sent {} values, expected {}",
                        source,
                        values.len(),
                        counts[source]
                    ),
                ));
            }
            let slot = buffer
                .get_mut(displs[source]..displs[source] + counts[source])
                .ok_or_else(|| {
                    SearchError::communication(
                        self.rank,
                        format!("displacement for rank {} exceeds the result buffer", source),
                    )
                })?;
            slot.copy_from_slice(&values);
        }
        Ok(Some(buffer))
    }

    fn barrier(&mut self) -> SearchResult<()> {
        let seq = self.next_seq();
        if !self.is_coordinator() {
            self.send(COORDINATOR, seq, Payload::Token)?;
            let release = self.recv(COORDINATOR, seq)?;
            return self.expect_token(COORDINATOR, release);
        }

        let rank = self.rank;
        for source in (0..self.size).filter(|&r| r != rank) {
            let arrival = self.recv(source, seq)?;
            self.expect_token(source, arrival)?;
        }
        for dest in (0..self.size).filter(|&r| r != rank) {
            self.send(dest, seq, Payload::Token)?;
        }
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        if self.abort_sent {
            return;
        }
        self.abort_sent = true;
        warn!("Rank {} aborting the run: {}", self.rank, reason);
        for tx in self.peers.iter().flatten() {
            // A peer that already left needs no notice.
            let _ = tx.send(Envelope {
                source: self.rank,
                seq: self.seq,
                message: Message::Abort(reason.to_string()),
            });
        }
    }

    fn finalize(&mut self) {
        self.finished = true;
    }
}

impl Drop for ChannelComm {
    fn drop(&mut self) {
        if !self.finished && self.abort_notice.is_none() {
            let reason = format!("rank {} exited before completing the protocol", self.rank);
            self.abort(&reason);
        }
    }
}
