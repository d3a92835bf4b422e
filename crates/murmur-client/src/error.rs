//! Client error types.

use murmur_core::{CodecError, DirectoryError, TransportError};
use murmur_proto::ParticipantId;
use thiserror::Error;

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The directory has no public key for the peer yet.
    #[error("missing public key for {peer}")]
    MissingPeerKey {
        /// Peer whose key is missing.
        peer: ParticipantId,
    },

    /// The peer's published key cannot be used for agreement.
    #[error("invalid public key for {peer}: {reason}")]
    InvalidPeerKey {
        /// Peer whose key was rejected.
        peer: ParticipantId,
        /// Why it was rejected.
        reason: String,
    },

    /// No identity is installed for the local participant.
    #[error("missing own identity")]
    MissingOwnIdentity,

    /// Message text was empty after trimming.
    #[error("message is empty")]
    EmptyMessage,

    /// The relay rejected the request.
    #[error("relay rejected request: {reason}")]
    BadRequest {
        /// Relay's error message.
        reason: String,
    },

    /// Envelope tag did not verify.
    #[error("envelope failed authentication")]
    AuthenticationFailure,

    /// Envelope or payload is structurally invalid.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Description of the defect.
        reason: String,
    },

    /// Decrypted payload disagrees with the relay's routing metadata.
    #[error("misrouted payload: relay says {relay_from} -> {relay_to}, payload says {sender} -> {recipient}")]
    MisroutedPayload {
        /// Sender according to the relay.
        relay_from: ParticipantId,
        /// Recipient according to the relay.
        relay_to: ParticipantId,
        /// Sender inside the payload.
        sender: ParticipantId,
        /// Recipient inside the payload.
        recipient: ParticipantId,
    },

    /// A relay call exceeded the configured timeout.
    #[error("relay call timed out")]
    TransportTimeout,

    /// A relay call failed.
    #[error("transport error: {reason}")]
    Transport {
        /// Description of the failure.
        reason: String,
    },

    /// Local state could not be loaded or saved.
    #[error("storage error: {reason}")]
    Storage {
        /// Description of the failure.
        reason: String,
    },
}

impl ClientError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Only a missing own identity is fatal: it means the engine was wired
    /// up wrong. Everything else affects one message or one tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingOwnIdentity)
    }

    /// Returns true if retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transient: the peer may (re)publish, the relay may come back
            Self::MissingPeerKey { .. }
            | Self::InvalidPeerKey { .. }
            | Self::TransportTimeout
            | Self::Transport { .. }
            | Self::Storage { .. } => true,

            // Permanent for this input
            Self::MissingOwnIdentity
            | Self::EmptyMessage
            | Self::BadRequest { .. }
            | Self::AuthenticationFailure
            | Self::MalformedEnvelope { .. }
            | Self::MisroutedPayload { .. } => false,
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::AuthenticationFailure => Self::AuthenticationFailure,
            CodecError::MalformedEnvelope(reason) => Self::MalformedEnvelope { reason },
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::TransportTimeout,
            TransportError::BadRequest(reason) => Self::BadRequest { reason },
            TransportError::Unreachable(reason) | TransportError::Protocol(reason) => {
                Self::Transport { reason }
            },
        }
    }
}

impl From<DirectoryError> for ClientError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(peer) => Self::MissingPeerKey { peer },
            DirectoryError::Corrupt { participant, reason } => Self::Storage {
                reason: format!("corrupt directory entry for {participant}: {reason}"),
            },
        }
    }
}
