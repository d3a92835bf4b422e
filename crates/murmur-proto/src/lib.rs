//! Murmur wire types.
//!
//! Everything that crosses the relay boundary lives here: participant
//! identifiers, the `{nonce, ciphertext}` envelope, mailbox messages and the
//! request/response bodies of the relay's two endpoints.
//!
//! The relay never sees plaintext. The types in this crate are exactly what
//! it is allowed to observe.
//!
//! # Wire format
//!
//! All relay bodies are JSON. Binary fields (nonces, ciphertext, public keys)
//! are base64url without padding.
//!
//! ```text
//! POST /send     {"to":"Bob","from":"Alice","envelope":{"nonce":"..","ciphertext":".."}}
//!            ->  {"ok":true}
//! GET  /receive?participant=Bob
//!            ->  {"messages":[{"to":"Bob","from":"Alice","envelope":{..},"received_at":..}]}
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod b64;
mod envelope;
mod error;
mod ids;
pub mod relay;

pub use envelope::Envelope;
pub use error::ProtoError;
pub use ids::{ParticipantId, ThreadKey};
pub use relay::{
    ErrorResponse, HealthResponse, MailboxMessage, ReceiveQuery, ReceiveResponse, SendRequest,
    SendResponse,
};
