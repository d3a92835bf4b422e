//! Model relay: one FIFO mailbox per recipient and a fault switch.

use std::collections::{BTreeMap, VecDeque};

use super::{client::ModelMessage, operation::ClientId};
use crate::FaultMode;

/// Model relay state.
#[derive(Debug, Clone, Default)]
pub struct ModelRelay {
    mode: FaultMode,
    mailboxes: BTreeMap<ClientId, VecDeque<ModelMessage>>,
}

impl ModelRelay {
    /// Create a healthy, empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether calls currently succeed. A hanging relay is as good as a
    /// down one once the caller's timeout fires.
    pub fn is_available(&self) -> bool {
        self.mode == FaultMode::Healthy
    }

    /// Switch fault mode.
    pub fn set_mode(&mut self, mode: FaultMode) {
        self.mode = mode;
    }

    /// Append to the recipient's mailbox.
    pub fn append(&mut self, message: ModelMessage) {
        self.mailboxes.entry(message.to).or_default().push_back(message);
    }

    /// Remove everything queued for `client`.
    pub fn drain(&mut self, client: ClientId) -> VecDeque<ModelMessage> {
        self.mailboxes.remove(&client).unwrap_or_default()
    }

    /// Messages waiting for `client`.
    pub fn pending(&self, client: ClientId) -> usize {
        self.mailboxes.get(&client).map_or(0, VecDeque::len)
    }
}
