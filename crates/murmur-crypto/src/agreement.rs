//! Pairwise session key agreement.
//!
//! ```text
//! shared  = X25519(own_secret, peer_public)
//! info    = min(pub_a, pub_b) || max(pub_a, pub_b)
//! session = HKDF-SHA256(salt = "murmur session v1", ikm = shared, info)
//! ```
//!
//! Ordering the public keys in `info` makes the derivation symmetric: both
//! participants compute the same key from their own side of the exchange.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, IdentityKeyPair, KEY_SIZE, PUBLIC_KEY_SIZE, PublicKey};

const SESSION_SALT: &[u8] = b"murmur session v1";

/// Symmetric key shared by one pair of participants.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Wrap raw key bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Derive the session key between `own` and the holder of `peer`.
///
/// # Errors
///
/// - `CryptoError::InvalidKey` if `peer` is a low-order point (the shared
///   secret would be all zeros)
pub fn derive_session_key(
    own: &IdentityKeyPair,
    peer: &PublicKey,
) -> Result<SessionKey, CryptoError> {
    let shared = own.secret().diffie_hellman(&x25519_dalek::PublicKey::from(*peer));
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey("peer public key has low order".to_owned()));
    }

    let own_public = own.public_key();
    let (low, high) = if own_public <= *peer { (own_public, *peer) } else { (*peer, own_public) };
    let mut info = [0u8; PUBLIC_KEY_SIZE * 2];
    info[..PUBLIC_KEY_SIZE].copy_from_slice(low.as_bytes());
    info[PUBLIC_KEY_SIZE..].copy_from_slice(high.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(SESSION_SALT), shared.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    hk.expand(&info, &mut okm).map_err(|_| CryptoError::KeyDerivation)?;

    let key = SessionKey(okm);
    okm.zeroize();
    Ok(key)
}
