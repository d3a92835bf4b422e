//! Fuzz target for envelope decoding and opening
//!
//! Prevent forged or mangled envelopes from producing plaintext
//!
//! # Strategy
//!
//! - Raw JSON: arbitrary text through `Envelope::from_json`
//! - Raw fields: arbitrary nonce and ciphertext bytes under an arbitrary key
//! - Mutation: seal a well-formed payload, then flip one bit or truncate
//!
//! # Invariants
//!
//! - An honest envelope opens to exactly the payload that was sealed
//! - Any single-bit flip or truncation MUST fail to open
//! - A wrong key MUST fail to open
//! - NEVER panic on malformed input

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_core::{decrypt_payload, encrypt_payload, CodecError, Payload};
use murmur_crypto::SessionKey;
use murmur_harness::SimEnv;
use murmur_proto::{Envelope, ParticipantId};

#[derive(Debug, Arbitrary)]
enum Mutation {
    None,
    FlipBit { index: u16, bit: u8 },
    Truncate { len: u16 },
    WrongKey { key: [u8; 32] },
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    key: [u8; 32],
    seed: u64,
    json: String,
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    text: String,
    timestamp: u64,
    mutation: Mutation,
}

fuzz_target!(|input: FuzzInput| {
    let key = SessionKey::from_bytes(input.key);

    if let Ok(envelope) = Envelope::from_json(&input.json) {
        let _ = decrypt_payload(&key, &envelope);
    }

    let raw = Envelope { nonce: input.nonce, ciphertext: input.ciphertext };
    assert!(decrypt_payload(&key, &raw).is_err(), "forged envelope opened");

    let env = SimEnv::with_seed(input.seed);
    let (Ok(alice), Ok(bob)) = (ParticipantId::new("alice"), ParticipantId::new("bob")) else {
        return;
    };
    let payload = Payload {
        message_id: murmur_core::new_message_id(&env),
        sender_id: alice,
        recipient_id: bob,
        text: input.text,
        timestamp: input.timestamp,
    };
    let Ok(mut envelope) = encrypt_payload(&env, &key, &payload) else {
        panic!("sealing a well-formed payload failed");
    };

    match input.mutation {
        Mutation::None => {
            assert_eq!(decrypt_payload(&key, &envelope).ok(), Some(payload));
        },
        Mutation::FlipBit { index, bit } => {
            let index = usize::from(index) % envelope.ciphertext.len();
            envelope.ciphertext[index] ^= 1 << (bit % 8);
            assert_eq!(decrypt_payload(&key, &envelope), Err(CodecError::AuthenticationFailure));
        },
        Mutation::Truncate { len } => {
            let len = usize::from(len) % envelope.ciphertext.len();
            envelope.ciphertext.truncate(len);
            assert!(decrypt_payload(&key, &envelope).is_err());
        },
        Mutation::WrongKey { key: other } => {
            if other != input.key {
                let wrong = SessionKey::from_bytes(other);
                assert!(decrypt_payload(&wrong, &envelope).is_err());
            }
        },
    }
});
