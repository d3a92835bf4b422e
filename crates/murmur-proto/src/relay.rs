//! Request and response bodies of the relay HTTP surface.
//!
//! Inbound bodies ([`SendRequest`], [`ReceiveQuery`]) keep every field
//! optional so that a missing field reaches the relay's own validation and is
//! answered with `400 {"error": ..}` instead of a framework rejection.

use serde::{Deserialize, Serialize};

use crate::{Envelope, ParticipantId};

/// Body of `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Recipient participant id.
    #[serde(default)]
    pub to: String,
    /// Sender participant id.
    #[serde(default)]
    pub from: String,
    /// Encrypted payload.
    #[serde(default)]
    pub envelope: Option<Envelope>,
}

impl SendRequest {
    /// Build a request from validated ids.
    pub fn new(to: &ParticipantId, from: &ParticipantId, envelope: Envelope) -> Self {
        Self { to: to.to_string(), from: from.to_string(), envelope: Some(envelope) }
    }
}

/// Body returned by a successful `POST /send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// Always `true` on success.
    pub ok: bool,
}

impl SendResponse {
    /// The success acknowledgement.
    pub const ACK: Self = Self { ok: true };
}

/// Query string of `GET /receive`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveQuery {
    /// Participant whose mailbox is drained.
    #[serde(default)]
    pub participant: Option<String>,
}

/// A message as queued in a relay mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxMessage {
    /// Recipient.
    pub to: ParticipantId,
    /// Sender as claimed in the send request.
    pub from: ParticipantId,
    /// Opaque encrypted payload.
    pub envelope: Envelope,
    /// Relay clock at append time, Unix milliseconds.
    pub received_at: u64,
}

/// Body returned by `GET /receive`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveResponse {
    /// Drained messages in arrival order.
    pub messages: Vec<MailboxMessage>,
}

/// Body of every 4xx/5xx relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` while the relay is serving.
    pub status: String,
}
