//! Protocol error types.

use thiserror::Error;

/// Errors from parsing wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Participant identifier is empty or contains a reserved character.
    #[error("invalid participant id {id:?}: {reason}")]
    InvalidParticipant {
        /// The rejected identifier.
        id: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Thread key is not of the form `A|B`.
    #[error("invalid thread key: {0:?}")]
    InvalidThreadKey(String),

    /// Base64url decoding failed.
    #[error("invalid base64: {0}")]
    Base64(String),
}
