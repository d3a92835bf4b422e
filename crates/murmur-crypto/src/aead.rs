//! XChaCha20-Poly1305 sealing under a session key.
//!
//! Key size: 32 bytes. Nonce: 24 bytes, supplied by the caller and fresh for
//! every message. Tag: 16 bytes, appended to the ciphertext.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{CryptoError, SessionKey};

/// Session key size in bytes.
pub const KEY_SIZE: usize = 32;

/// XChaCha20 nonce size in bytes.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Seal `plaintext` under `key` with the given nonce.
///
/// `aad` is authenticated but not encrypted. Reusing a nonce under the same
/// key breaks confidentiality; callers draw a fresh one from a CSPRNG.
pub fn seal(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .encrypt(XNonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::MalformedEnvelope("plaintext too large".to_owned()))
}

/// Open a sealed message.
///
/// Lengths are checked before any cryptographic work.
///
/// # Errors
///
/// - `CryptoError::MalformedEnvelope` if `nonce` is not 24 bytes or
///   `ciphertext` is shorter than the tag
/// - `CryptoError::AuthenticationFailure` if the tag does not verify
pub fn open(
    key: &SessionKey,
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::MalformedEnvelope(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::MalformedEnvelope(format!(
            "ciphertext shorter than {TAG_SIZE}-byte tag"
        )));
    }

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AuthenticationFailure)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const KEY: [u8; KEY_SIZE] = [0x11; KEY_SIZE];
    const NONCE: [u8; NONCE_SIZE] = [0x22; NONCE_SIZE];

    #[test]
    fn seal_open() {
        let key = SessionKey::from_bytes(KEY);
        let sealed = seal(&key, &NONCE, b"hello", b"").unwrap();
        assert_eq!(sealed.len(), 5 + TAG_SIZE);
        assert_eq!(open(&key, &NONCE, &sealed, b"").unwrap(), b"hello");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let sealed = seal(&SessionKey::from_bytes(KEY), &NONCE, b"hello", b"").unwrap();
        let other = SessionKey::from_bytes([0x12; KEY_SIZE]);
        assert_eq!(open(&other, &NONCE, &sealed, b""), Err(CryptoError::AuthenticationFailure));
    }

    #[test]
    fn wrong_aad_fails_authentication() {
        let key = SessionKey::from_bytes(KEY);
        let sealed = seal(&key, &NONCE, b"hello", b"a").unwrap();
        assert_eq!(open(&key, &NONCE, &sealed, b"b"), Err(CryptoError::AuthenticationFailure));
    }

    #[test]
    fn length_checks_come_first() {
        let key = SessionKey::from_bytes(KEY);
        assert!(matches!(
            open(&key, &NONCE[..12], &[0; 32], b""),
            Err(CryptoError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            open(&key, &NONCE, &[0; TAG_SIZE - 1], b""),
            Err(CryptoError::MalformedEnvelope(_))
        ));
        // Tag-only ciphertext is well-formed and just fails to verify.
        assert_eq!(open(&key, &NONCE, &[0; TAG_SIZE], b""), Err(CryptoError::AuthenticationFailure));
    }

    proptest! {
        #[test]
        fn any_bit_flip_is_detected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            bit in any::<prop::sample::Index>(),
        ) {
            let key = SessionKey::from_bytes(KEY);
            let mut sealed = seal(&key, &NONCE, &plaintext, b"").unwrap();
            let bit = bit.index(sealed.len() * 8);
            sealed[bit / 8] ^= 1 << (bit % 8);
            prop_assert_eq!(open(&key, &NONCE, &sealed, b""), Err(CryptoError::AuthenticationFailure));
        }
    }
}
