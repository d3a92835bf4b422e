//! Relay mailbox store.
//!
//! One insertion-ordered queue per recipient. The relay never decrypts
//! anything; it checks that a request names both parties and carries a
//! non-empty envelope of acceptable size, stamps it with its own clock and
//! queues it.
//!
//! # Atomicity
//!
//! Append holds the shard lock of the recipient's entry for the push. Drain
//! is a single `remove` of the whole entry. A racing append therefore lands
//! either in the drain that is in progress or in the next one, never in
//! both and never nowhere.

use async_trait::async_trait;
use dashmap::DashMap;
use murmur_core::{Environment, Relay, TransportError};
use murmur_proto::{MailboxMessage, ParticipantId, SendRequest};

use crate::RelayError;

/// Default cap on `nonce + ciphertext` bytes per envelope (64 KiB).
pub const DEFAULT_MAX_ENVELOPE_BYTES: usize = 64 * 1024;

/// In-memory, non-durable mailboxes keyed by recipient.
pub struct MailboxStore<E: Environment> {
    env: E,
    mailboxes: DashMap<ParticipantId, Vec<MailboxMessage>>,
    max_envelope_bytes: usize,
}

impl<E: Environment> MailboxStore<E> {
    /// Empty store with the given envelope size cap.
    pub fn new(env: E, max_envelope_bytes: usize) -> Self {
        Self { env, mailboxes: DashMap::new(), max_envelope_bytes }
    }

    /// Validate `request` and append it to the recipient's mailbox.
    ///
    /// # Errors
    ///
    /// - `RelayError::BadRequest` if `to` or `from` is missing or invalid,
    ///   the envelope is missing or empty, or it exceeds the size cap
    pub fn append(&self, request: SendRequest) -> Result<(), RelayError> {
        let to = parse_participant("to", request.to)?;
        let from = parse_participant("from", request.from)?;
        let envelope = request
            .envelope
            .ok_or_else(|| RelayError::BadRequest("missing field: envelope".to_owned()))?;
        if envelope.ciphertext.is_empty() {
            return Err(RelayError::BadRequest("empty envelope".to_owned()));
        }
        if envelope.len() > self.max_envelope_bytes {
            return Err(RelayError::BadRequest(format!(
                "envelope of {} bytes exceeds limit of {}",
                envelope.len(),
                self.max_envelope_bytes
            )));
        }

        let message =
            MailboxMessage { to: to.clone(), from, envelope, received_at: self.env.unix_millis() };
        tracing::debug!(
            to = %message.to,
            from = %message.from,
            bytes = message.envelope.len(),
            "queued envelope"
        );
        self.mailboxes.entry(to).or_default().push(message);
        Ok(())
    }

    /// Remove and return every message queued for `participant`, oldest
    /// first. Empty when nothing is queued.
    pub fn drain(&self, participant: &ParticipantId) -> Vec<MailboxMessage> {
        let messages =
            self.mailboxes.remove(participant).map(|(_, queue)| queue).unwrap_or_default();
        if !messages.is_empty() {
            tracing::debug!(%participant, count = messages.len(), "drained mailbox");
        }
        messages
    }

    /// Number of messages waiting for `participant`.
    pub fn pending(&self, participant: &ParticipantId) -> usize {
        self.mailboxes.get(participant).map_or(0, |queue| queue.len())
    }

    /// Number of non-empty mailboxes.
    pub fn mailbox_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// Configured envelope size cap.
    pub fn max_envelope_bytes(&self) -> usize {
        self.max_envelope_bytes
    }
}

fn parse_participant(field: &str, value: String) -> Result<ParticipantId, RelayError> {
    if value.is_empty() {
        return Err(RelayError::BadRequest(format!("missing field: {field}")));
    }
    ParticipantId::new(value).map_err(|e| RelayError::BadRequest(e.to_string()))
}

#[async_trait]
impl<E: Environment> Relay for MailboxStore<E> {
    async fn send(&self, request: SendRequest) -> Result<(), TransportError> {
        self.append(request)
            .map_err(|RelayError::BadRequest(reason)| TransportError::BadRequest(reason))
    }

    async fn receive(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<MailboxMessage>, TransportError> {
        Ok(self.drain(participant))
    }
}
