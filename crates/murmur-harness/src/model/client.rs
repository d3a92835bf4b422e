//! Model client state machine.
//!
//! Tracks the outbox and one thread per peer. No cryptography and no
//! timestamps, just the logical state transitions.

use std::collections::{BTreeMap, VecDeque};

use super::operation::ClientId;

/// Message in the model (simplified).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModelMessage {
    /// Sender's client ID.
    pub from: ClientId,
    /// Recipient's client ID.
    pub to: ClientId,
    /// Message text.
    pub text: String,
}

/// Model client state.
#[derive(Debug, Clone)]
pub struct ModelClient {
    id: ClientId,
    outbox: VecDeque<ModelMessage>,
    threads: BTreeMap<ClientId, Vec<ModelMessage>>,
}

impl ModelClient {
    /// Create a new model client.
    pub fn new(id: ClientId) -> Self {
        Self { id, outbox: VecDeque::new(), threads: BTreeMap::new() }
    }

    /// Client identifier.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Queue an outbound message.
    pub fn enqueue(&mut self, message: ModelMessage) {
        self.outbox.push_back(message);
    }

    /// Take the whole outbox, oldest first.
    pub fn take_outbox(&mut self) -> VecDeque<ModelMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Messages waiting to be sent.
    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Record a message in the thread with the other party.
    pub fn record(&mut self, message: ModelMessage) {
        let peer = if message.from == self.id { message.to } else { message.from };
        self.threads.entry(peer).or_default().push(message);
    }

    /// Thread with `peer`, in the order the model recorded it.
    pub fn thread(&self, peer: ClientId) -> &[ModelMessage] {
        self.threads.get(&peer).map(Vec::as_slice).unwrap_or_default()
    }

    /// Peers with at least one message, ascending.
    pub fn peers(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.threads.keys().copied()
    }
}
