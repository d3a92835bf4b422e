//! Relay port.
//!
//! The sync engine talks to the relay only through this trait. The relay
//! store implements it directly for in-process use and tests; the HTTP
//! client implements it against a remote relay.

use async_trait::async_trait;
use murmur_proto::{MailboxMessage, ParticipantId, SendRequest};

use crate::TransportError;

/// Store-and-forward relay.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Append an envelope to the recipient's mailbox.
    async fn send(&self, request: SendRequest) -> Result<(), TransportError>;

    /// Drain and return every message queued for `participant`, oldest
    /// first.
    async fn receive(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<MailboxMessage>, TransportError>;
}

#[async_trait]
impl<R: Relay + ?Sized> Relay for std::sync::Arc<R> {
    async fn send(&self, request: SendRequest) -> Result<(), TransportError> {
        (**self).send(request).await
    }

    async fn receive(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<MailboxMessage>, TransportError> {
        (**self).receive(participant).await
    }
}
