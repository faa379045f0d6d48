//! Producer half of a stream connection: sequencing and replay suppression.

use crate::sse::SseFrame;
use std::collections::{HashSet, VecDeque};
use tokio::sync::mpsc;
use vitrine_types::Envelope;

/// Number of recent SSE ids remembered for replay suppression.
const SEEN_ID_CAPACITY: usize = 256;

/// An envelope together with its position in the connection's sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    /// 1-based delivery sequence number, strictly increasing per connection.
    pub seq: u64,
    /// The envelope as received.
    pub envelope: Envelope,
}

/// Outcome of pushing a frame or envelope into the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// Delivered with this sequence number.
    Delivered(u64),
    /// The SSE id was already delivered on this connection.
    Duplicate,
    /// The frame did not parse as an envelope.
    Malformed,
    /// The consumer is gone; the producer should stop.
    Closed,
}

/// Appends envelopes to a connection's sequence.
///
/// Owned by whichever task produces envelopes: the HTTP transport task for
/// network connections, or a test/replay driver for in-process ones.
#[derive(Debug)]
pub struct EnvelopeFeed {
    tx: mpsc::Sender<Received>,
    next_seq: u64,
    seen_order: VecDeque<String>,
    seen: HashSet<String>,
}

impl EnvelopeFeed {
    pub(crate) fn new(tx: mpsc::Sender<Received>) -> Self {
        Self {
            tx,
            next_seq: 1,
            seen_order: VecDeque::with_capacity(SEEN_ID_CAPACITY),
            seen: HashSet::with_capacity(SEEN_ID_CAPACITY),
        }
    }

    /// Appends an envelope. `id` is the transport-level event id, if any.
    ///
    /// Waits when the consumer's buffer is full.
    pub async fn push(&mut self, envelope: Envelope, id: Option<&str>) -> Push {
        if let Some(id) = id {
            if self.seen.contains(id) {
                tracing::debug!(event_id = id, "dropping replayed event");
                return Push::Duplicate;
            }
        }

        let seq = self.next_seq;
        if self.tx.send(Received { seq, envelope }).await.is_err() {
            return Push::Closed;
        }
        self.next_seq += 1;
        if let Some(id) = id {
            self.remember(id);
        }
        Push::Delivered(seq)
    }

    /// Parses a decoded SSE frame and appends it. Malformed frames are dropped.
    pub async fn push_frame(&mut self, frame: &SseFrame) -> Push {
        match Envelope::parse(&frame.data) {
            Ok(envelope) => self.push(envelope, frame.id.as_deref()).await,
            Err(e) => {
                tracing::debug!(error = %e, event_id = ?frame.id, "dropping malformed frame");
                Push::Malformed
            }
        }
    }

    /// Returns `true` once the consumer has been dropped or closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the consumer is dropped or closed.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    fn remember(&mut self, id: &str) {
        if self.seen_order.len() == SEEN_ID_CAPACITY {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen_order.push_back(id.to_string());
        self.seen.insert(id.to_string());
    }
}
