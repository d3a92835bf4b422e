//! Model world - orchestrates clients and the relay.
//!
//! The world is the top-level container that manages the model state
//! and applies operations. It's the oracle against which the real
//! engines are verified.

use super::{
    client::{ModelClient, ModelMessage},
    operation::{ClientId, Operation, OperationError, OperationResult},
    relay::ModelRelay,
};

/// Observable state for oracle comparison.
///
/// Threads are compared as multisets: the real log orders by sender
/// timestamp, which the model does not track, so every thread is sorted
/// before comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Per-client outbox length.
    pub outbox_lens: Vec<usize>,
    /// Per-client threads: (peer, sorted messages), ascending by peer.
    pub client_threads: Vec<Vec<(ClientId, Vec<ModelMessage>)>>,
    /// Per-client count of messages waiting at the relay.
    pub relay_pending: Vec<usize>,
}

impl ObservableState {
    /// Normalise a thread for comparison.
    pub fn canonical_thread(mut messages: Vec<ModelMessage>) -> Vec<ModelMessage> {
        messages.sort();
        messages
    }
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    clients: Vec<ModelClient>,
    relay: ModelRelay,
}

impl ModelWorld {
    /// Create a new model world with the given number of clients.
    pub fn new(num_clients: usize) -> Self {
        let clients = (0..num_clients)
            .filter_map(|i| ClientId::try_from(i).ok())
            .map(ModelClient::new)
            .collect();

        Self { clients, relay: ModelRelay::new() }
    }

    /// Number of clients in the world.
    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }

    /// Get a client by ID.
    pub fn client(&self, id: ClientId) -> Option<&ModelClient> {
        self.clients.get(usize::from(id))
    }

    /// Get the relay.
    pub fn relay(&self) -> &ModelRelay {
        &self.relay
    }

    /// Apply an operation and return the result.
    ///
    /// This is the main entry point for model-based testing.
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::SendMessage { from, to, content } => {
                self.apply_send(*from, *to, content.to_text())
            },
            Operation::Tick { client_id } => self.apply_tick(*client_id),
            Operation::SetRelayFault { mode } => {
                self.relay.set_mode(*mode);
                OperationResult::Ok
            },
            Operation::AdvanceTime { .. } => OperationResult::Ok,
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let outbox_lens = self.clients.iter().map(ModelClient::outbox_len).collect();
        let client_threads = self
            .clients
            .iter()
            .map(|client| {
                client
                    .peers()
                    .map(|peer| {
                        (peer, ObservableState::canonical_thread(client.thread(peer).to_vec()))
                    })
                    .collect()
            })
            .collect();
        let relay_pending = self.clients.iter().map(|c| self.relay.pending(c.id())).collect();

        ObservableState { outbox_lens, client_threads, relay_pending }
    }

    fn apply_send(&mut self, from: ClientId, to: ClientId, text: String) -> OperationResult {
        if usize::from(from) >= self.clients.len() || usize::from(to) >= self.clients.len() {
            return OperationResult::Error(OperationError::InvalidClient);
        }
        if from == to {
            return OperationResult::Error(OperationError::SelfMessage);
        }
        let text = text.trim();
        if text.is_empty() {
            return OperationResult::Error(OperationError::EmptyMessage);
        }

        let text = text.to_owned();
        self.clients[usize::from(from)].enqueue(ModelMessage { from, to, text });
        self.flush(from);

        // Transport failures defer, they never fail the send itself.
        OperationResult::Ok
    }

    fn apply_tick(&mut self, client_id: ClientId) -> OperationResult {
        if usize::from(client_id) >= self.clients.len() {
            return OperationResult::Error(OperationError::InvalidClient);
        }

        self.flush(client_id);
        if !self.relay.is_available() {
            return OperationResult::Error(OperationError::RelayUnavailable);
        }

        let inbound = self.relay.drain(client_id);
        let client = &mut self.clients[usize::from(client_id)];
        for message in inbound {
            client.record(message);
        }
        OperationResult::Ok
    }

    /// Hand the whole outbox to the relay, or keep all of it.
    fn flush(&mut self, client_id: ClientId) {
        if !self.relay.is_available() {
            return;
        }
        let client = &mut self.clients[usize::from(client_id)];
        for message in client.take_outbox() {
            self.relay.append(message.clone());
            client.record(message);
        }
    }
}
