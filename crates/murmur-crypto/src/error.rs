use thiserror::Error;

/// Errors from key agreement and envelope sealing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Tag mismatch: the ciphertext was altered or sealed under another key.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// Nonce or ciphertext has an impossible length.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Public key is malformed or of low order.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// HKDF refused the requested output length.
    #[error("key derivation failed")]
    KeyDerivation,
}
