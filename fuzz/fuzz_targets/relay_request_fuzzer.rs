//! Fuzz target for relay request intake
//!
//! Prevent malformed `/send` bodies from corrupting mailboxes
//!
//! # Strategy
//!
//! - Raw bytes through the `SendRequest` JSON schema
//! - Accepted requests appended to a small-limit store, then drained
//!
//! # Invariants
//!
//! - A rejected request leaves every mailbox untouched
//! - An accepted request is the only message in its recipient's mailbox and
//!   comes back unchanged on drain
//! - A drained mailbox is empty
//! - NEVER panic on malformed input

#![no_main]

use libfuzzer_sys::fuzz_target;
use murmur_harness::SimEnv;
use murmur_proto::{ParticipantId, SendRequest};
use murmur_server::MailboxStore;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<SendRequest>(data) else {
        return;
    };

    let store = MailboxStore::new(SimEnv::with_seed(0), 1024);
    let to = ParticipantId::new(request.to.clone()).ok();
    let envelope = request.envelope.clone();

    match store.append(request) {
        Ok(()) => {
            let Some(to) = to else {
                panic!("accepted a request with an invalid recipient");
            };
            assert_eq!(store.pending(&to), 1);
            let drained = store.drain(&to);
            assert_eq!(drained.len(), 1);
            assert_eq!(Some(&drained[0].envelope), envelope.as_ref());
            assert_eq!(store.pending(&to), 0);
        },
        Err(_) => assert_eq!(store.mailbox_count(), 0),
    }
});
