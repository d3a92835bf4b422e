//! Envelope codec: payload record to sealed envelope and back.
//!
//! ```text
//! Payload --CBOR--> plaintext --seal(session key, random nonce)--> Envelope
//! Envelope --length checks--> open --CBOR + schema checks--> Payload
//! ```
//!
//! Decryption never yields partial data: a payload is returned only after
//! the tag verified and the plaintext decoded into the fixed schema.

use murmur_crypto::{NONCE_SIZE, SessionKey, aead};
use murmur_proto::{Envelope, ParticipantId};
use serde::{Deserialize, Serialize};

use crate::{CodecError, env::Environment};

/// Associated data bound into every envelope.
const ENVELOPE_AAD: &[u8] = b"murmur envelope v1";

/// The encrypted content of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Sender-assigned id, 32 lowercase hex characters.
    pub message_id: String,
    /// Author of the message.
    pub sender_id: ParticipantId,
    /// Intended reader.
    pub recipient_id: ParticipantId,
    /// Message body.
    pub text: String,
    /// Sender's wall clock at send time, Unix milliseconds.
    pub timestamp: u64,
}

/// Draw a fresh 128-bit message id from the environment.
pub fn new_message_id<E: Environment>(env: &E) -> String {
    hex::encode(env.random_u128().to_be_bytes())
}

/// Serialize and seal `payload` under `key` with a fresh random nonce.
pub fn encrypt_payload<E: Environment>(
    env: &E,
    key: &SessionKey,
    payload: &Payload,
) -> Result<Envelope, CodecError> {
    let mut plaintext = Vec::new();
    ciborium::into_writer(payload, &mut plaintext)
        .map_err(|e| CodecError::MalformedEnvelope(e.to_string()))?;

    let mut nonce = [0u8; NONCE_SIZE];
    env.random_bytes(&mut nonce);

    let ciphertext = aead::seal(key, &nonce, &plaintext, ENVELOPE_AAD)?;
    Ok(Envelope { nonce: nonce.to_vec(), ciphertext })
}

/// Open `envelope` under `key` and decode the payload.
///
/// # Errors
///
/// - `CodecError::MalformedEnvelope` for a bad nonce length, a ciphertext
///   shorter than the tag, or plaintext outside the payload schema
/// - `CodecError::AuthenticationFailure` if the envelope was altered or
///   sealed under a different key
pub fn decrypt_payload(key: &SessionKey, envelope: &Envelope) -> Result<Payload, CodecError> {
    let plaintext = aead::open(key, &envelope.nonce, &envelope.ciphertext, ENVELOPE_AAD)?;

    let payload: Payload = ciborium::from_reader(plaintext.as_slice())
        .map_err(|e| CodecError::MalformedEnvelope(format!("payload decode: {e}")))?;

    if payload.message_id.is_empty() {
        return Err(CodecError::MalformedEnvelope("empty message id".to_owned()));
    }

    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU8, Ordering},
        },
        time::{Duration, Instant},
    };

    use proptest::prelude::*;

    use super::*;

    /// Fills buffers with an incrementing byte so each nonce differs.
    #[derive(Clone, Default)]
    struct CountingEnv(Arc<AtomicU8>);

    impl Environment for CountingEnv {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn unix_millis(&self) -> u64 {
            0
        }

        async fn sleep(&self, _duration: Duration) {}

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(self.0.fetch_add(1, Ordering::Relaxed));
        }
    }

    fn payload(text: &str) -> Payload {
        Payload {
            message_id: "00112233445566778899aabbccddeeff".to_owned(),
            sender_id: ParticipantId::new("Alice").unwrap(),
            recipient_id: ParticipantId::new("Bob").unwrap(),
            text: text.to_owned(),
            timestamp: 1_700_000_000_000,
        }
    }

    fn sealed_bytes(key: &SessionKey, plaintext: &[u8]) -> Envelope {
        let nonce = [5u8; NONCE_SIZE];
        Envelope { nonce: nonce.to_vec(), ciphertext: aead::seal(key, &nonce, plaintext, ENVELOPE_AAD).unwrap() }
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let env = CountingEnv::default();
        let key = SessionKey::from_bytes([1; 32]);
        let first = encrypt_payload(&env, &key, &payload("hi")).unwrap();
        let second = encrypt_payload(&env, &key, &payload("hi")).unwrap();
        assert_eq!(first.nonce.len(), NONCE_SIZE);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn wrong_key_is_authentication_failure() {
        let env = CountingEnv::default();
        let envelope = encrypt_payload(&env, &SessionKey::from_bytes([1; 32]), &payload("hi")).unwrap();
        let result = decrypt_payload(&SessionKey::from_bytes([2; 32]), &envelope);
        assert_eq!(result, Err(CodecError::AuthenticationFailure));
    }

    #[test]
    fn short_nonce_is_malformed() {
        let envelope = Envelope { nonce: vec![0; 12], ciphertext: vec![0; 64] };
        let result = decrypt_payload(&SessionKey::from_bytes([1; 32]), &envelope);
        assert!(matches!(result, Err(CodecError::MalformedEnvelope(_))));
    }

    #[test]
    fn authentic_garbage_is_malformed() {
        let key = SessionKey::from_bytes([1; 32]);
        let envelope = sealed_bytes(&key, b"not cbor at all \xff\xff");
        assert!(matches!(decrypt_payload(&key, &envelope), Err(CodecError::MalformedEnvelope(_))));
    }

    #[test]
    fn empty_ids_are_malformed() {
        #[derive(Serialize)]
        struct Loose<'a> {
            message_id: &'a str,
            sender_id: &'a str,
            recipient_id: &'a str,
            text: &'a str,
            timestamp: u64,
        }

        let key = SessionKey::from_bytes([1; 32]);
        for (message_id, sender_id) in [("", "Alice"), ("ab", "")] {
            let mut plaintext = Vec::new();
            let loose = Loose { message_id, sender_id, recipient_id: "Bob", text: "x", timestamp: 1 };
            ciborium::into_writer(&loose, &mut plaintext).unwrap();
            let envelope = sealed_bytes(&key, &plaintext);
            assert!(matches!(decrypt_payload(&key, &envelope), Err(CodecError::MalformedEnvelope(_))));
        }
    }

    #[test]
    fn message_ids_are_hex() {
        let id = new_message_id(&CountingEnv::default());
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    proptest! {
        #[test]
        fn envelope_roundtrip(text in ".{0,200}", timestamp in any::<u64>(), key in any::<[u8; 32]>()) {
            let env = CountingEnv::default();
            let key = SessionKey::from_bytes(key);
            let mut original = payload(&text);
            original.timestamp = timestamp;

            let envelope = encrypt_payload(&env, &key, &original).unwrap();
            prop_assert_eq!(decrypt_payload(&key, &envelope).unwrap(), original);
        }
    }
}
