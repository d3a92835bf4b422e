//! Murmur client.
//!
//! The client side of an end-to-end encrypted conversation: a key ring that
//! derives one session key per peer, a local conversation log, pluggable
//! persistence, and the sync engine that ties them to a relay.
//!
//! ## Architecture
//!
//! ```text
//! murmur-client
//!   ├─ SyncEngine        (tick loop: send, poll, decrypt, merge)
//!   │    ├─ SessionKeyring   (identity + per-peer session keys)
//!   │    ├─ ConversationLog  (threads, dedup by id, sorted by time)
//!   │    └─ StateStore       (memory or JSON files)
//!   └─ HttpRelay         (reqwest relay client, feature "http")
//! ```
//!
//! The engine never holds plaintext outside its own log; the relay it talks
//! to only ever sees envelopes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod conversation;
pub mod engine;
mod error;
#[cfg(feature = "http")]
mod http;
mod keyring;
pub mod storage;

pub use conversation::{ConversationEntry, ConversationLog};
pub use engine::{
    MessageCallback, SyncConfig, SyncEngine, SyncPhase, TickReport, generate_identity,
};
pub use error::ClientError;
#[cfg(feature = "http")]
pub use http::HttpRelay;
pub use keyring::SessionKeyring;
pub use storage::{FileStateStore, MemoryStateStore, PersistedState, StateStore};
