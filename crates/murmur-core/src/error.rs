//! Error types for the directory, codec and relay port.

use murmur_crypto::CryptoError;
use murmur_proto::ParticipantId;
use thiserror::Error;

/// Key directory errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// No public key has been published for the participant.
    ///
    /// Retryable: the peer may publish later.
    #[error("no public key published for {0}")]
    NotFound(ParticipantId),

    /// A snapshot entry could not be decoded.
    #[error("corrupt directory entry for {participant}: {reason}")]
    Corrupt {
        /// Entry that failed to decode.
        participant: ParticipantId,
        /// Decoder message.
        reason: String,
    },
}

/// Envelope codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Tag mismatch: tampered envelope or wrong session key.
    #[error("envelope failed authentication")]
    AuthenticationFailure,

    /// Envelope shape or decrypted payload is invalid.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl From<CryptoError> for CodecError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthenticationFailure => Self::AuthenticationFailure,
            CryptoError::MalformedEnvelope(reason) | CryptoError::InvalidKey(reason) => {
                Self::MalformedEnvelope(reason)
            },
            CryptoError::KeyDerivation => Self::MalformedEnvelope("key derivation failed".to_owned()),
        }
    }
}

/// Relay transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The relay did not answer within the configured timeout.
    #[error("relay timed out")]
    Timeout,

    /// The relay rejected the request as invalid. Not retryable.
    #[error("relay rejected request: {0}")]
    BadRequest(String),

    /// The relay could not be reached.
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    /// The relay answered with something that is not the relay protocol.
    #[error("relay protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::BadRequest(_))
    }
}
