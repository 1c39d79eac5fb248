//! Outbound message routing
//!
//! Handlers never write to sockets. They return [`Outbound`] batches and the
//! session actor hands them to the [`Broadcaster`] once the handler has
//! returned. Each message is encoded once and the same bytes are queued on
//! every recipient's writer channel. Channels are bounded: a connection that
//! stops draining loses new messages instead of growing its queue.

use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::SmallVec;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::net::protocol::{encode, ServerMessage};

/// Connection identifier; a joined player reuses it as its player id
pub type ConnectionId = Uuid;

/// Encoded payload shared between recipients
pub type Payload = Arc<[u8]>;

/// Who receives an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    One(ConnectionId),
    /// Every open connection, joined or not
    All,
    AllExcept(ConnectionId),
}

impl Recipient {
    #[inline]
    pub fn includes(&self, conn_id: ConnectionId) -> bool {
        match self {
            Recipient::One(id) => *id == conn_id,
            Recipient::All => true,
            Recipient::AllExcept(id) => *id != conn_id,
        }
    }
}

/// A message addressed to one or more connections
#[derive(Debug, Clone)]
pub struct Outbound {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn to(conn_id: ConnectionId, message: ServerMessage) -> Self {
        Self {
            recipient: Recipient::One(conn_id),
            message,
        }
    }

    pub fn all(message: ServerMessage) -> Self {
        Self {
            recipient: Recipient::All,
            message,
        }
    }

    pub fn all_except(conn_id: ConnectionId, message: ServerMessage) -> Self {
        Self {
            recipient: Recipient::AllExcept(conn_id),
            message,
        }
    }
}

/// Messages produced by a single event
pub type OutboundBatch = SmallVec<[Outbound; 4]>;

/// Per-connection writer channels
pub struct Broadcaster {
    outboxes: HashMap<ConnectionId, Sender<Payload>>,
    metrics: Arc<Metrics>,
}

impl Broadcaster {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            outboxes: HashMap::new(),
            metrics,
        }
    }

    pub fn register(&mut self, conn_id: ConnectionId, outbox: Sender<Payload>) {
        self.outboxes.insert(conn_id, outbox);
    }

    pub fn unregister(&mut self, conn_id: ConnectionId) {
        self.outboxes.remove(&conn_id);
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Queue every message in `batch` on its recipients' channels
    ///
    /// Sends never block. A full channel drops the message for that
    /// recipient only. A closed channel means the connection task is already
    /// tearing down; its disconnect event will follow.
    pub fn dispatch(&self, batch: OutboundBatch) {
        for outbound in batch {
            let payload: Payload = match encode(&outbound.message) {
                Ok(data) => data.into(),
                Err(e) => {
                    warn!("Failed to encode message for broadcast: {}", e);
                    continue;
                }
            };

            for (conn_id, outbox) in &self.outboxes {
                if !outbound.recipient.includes(*conn_id) {
                    continue;
                }
                match outbox.try_send(payload.clone()) {
                    Ok(()) => Metrics::incr(&self.metrics.messages_sent),
                    Err(TrySendError::Full(_)) => {
                        debug!("Outbox for {} full, dropping message", conn_id);
                        Metrics::incr(&self.metrics.messages_dropped);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Outbox for {} closed, skipping", conn_id);
                    }
                }
            }
        }
    }
}
