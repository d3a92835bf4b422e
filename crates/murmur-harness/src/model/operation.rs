//! Operations for model-based testing.
//!
//! Operations represent all possible actions in the system. They are generated
//! randomly by proptest and applied to both the model and real implementation.

use arbitrary::Arbitrary;

use crate::FaultMode;

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Client sends a message to a peer.
    SendMessage {
        /// Sender.
        from: ClientId,
        /// Recipient.
        to: ClientId,
        /// Message content (kept small for efficiency).
        content: SmallMessage,
    },

    /// Client runs one sync tick.
    Tick {
        /// Client ticking.
        client_id: ClientId,
    },

    /// Change how the relay behaves.
    SetRelayFault {
        /// New fault mode.
        mode: FaultMode,
    },

    /// Advance simulation time.
    ///
    /// The model has no clock; the real system stamps later messages later.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

impl Operation {
    /// Map client ids into `0..num_clients` and make sends cross-client.
    ///
    /// `num_clients` must be at least 2.
    pub fn clamp(self, num_clients: usize) -> Self {
        let n = num_clients.clamp(2, usize::from(ClientId::MAX) + 1);
        let wrap = |id: usize| ClientId::try_from(id % n).unwrap_or_default();
        match self {
            Self::SendMessage { from, to, content } => {
                let from = usize::from(from) % n;
                let to = from + 1 + usize::from(to) % (n - 1);
                Self::SendMessage { from: wrap(from), to: wrap(to), content }
            },
            Self::Tick { client_id } => Self::Tick { client_id: wrap(usize::from(client_id)) },
            other => other,
        }
    }
}

/// Small message content for testing.
///
/// The text is deterministic from the seed.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallMessage {
    /// Message seed.
    pub seed: u8,
    /// Message length hint (0-3 maps to empty/small/medium/large).
    pub size_class: u8,
}

impl SmallMessage {
    /// Expand to message text.
    pub fn to_text(&self) -> String {
        let len = match self.size_class % 4 {
            0 => 0,
            1 => 8,
            2 => 64,
            _ => 256,
        };

        const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
        (0..len).map(|i| char::from(ALPHABET[(usize::from(self.seed) + i) % 26])).collect()
    }
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded.
    Ok,

    /// Operation failed with expected error.
    Error(OperationError),
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Invalid client ID.
    InvalidClient,

    /// Sender and recipient are the same client.
    SelfMessage,

    /// Message text was blank; nothing was queued.
    EmptyMessage,

    /// The relay could not be reached; the tick ended after the outbox.
    RelayUnavailable,
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationResult::Ok)
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}
