//! Murmur core: the pieces shared by the relay and the client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  lookup   ┌──────────────┐
//! │ KeyDirectory │◄──────────│  SyncEngine  │ (murmur-client)
//! └──────────────┘           └──────┬───────┘
//!                                   │ encrypt_payload / decrypt_payload
//!                            ┌──────▼───────┐
//!                            │    codec     │── murmur-crypto (seal/open)
//!                            └──────┬───────┘
//!                                   │ Envelope
//!                            ┌──────▼───────┐
//!                            │ Relay (port) │── MailboxStore / HttpRelay
//!                            └──────────────┘
//! ```
//!
//! Every source of time and randomness goes through [`Environment`], so the
//! same code runs under a simulated clock in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod directory;
pub mod env;
mod error;
#[cfg(feature = "system-env")]
mod system_env;
pub mod transport;

pub use codec::{Payload, decrypt_payload, encrypt_payload, new_message_id};
pub use directory::{DirectorySnapshot, KeyDirectory, MemoryDirectory};
pub use env::Environment;
pub use error::{CodecError, DirectoryError, TransportError};
#[cfg(feature = "system-env")]
pub use system_env::SystemEnv;
pub use transport::Relay;
