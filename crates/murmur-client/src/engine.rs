//! Client sync engine.
//!
//! One engine per local participant. Each tick walks a fixed sequence of
//! phases:
//!
//! ```text
//! Idle ──► Sending ──► Polling ──► Decrypting ──► Merging ──► Idle
//!          (outbox)    (drain)     (per message)   (log)
//!                         │
//!                         └─ relay failure: abort tick ──► Idle
//! ```
//!
//! - Sending: every queued message is sealed under the peer's session key
//!   with a fresh nonce and handed to the relay. Success inserts it into the
//!   local log. Retryable failures keep it queued; a relay rejection drops
//!   it.
//! - Polling: drain our mailbox. Failure or timeout ends the tick early;
//!   nothing was drained, so nothing is lost.
//! - Decrypting: messages held back on an earlier tick first, then the
//!   fresh ones, each on its own. A message whose sender has no usable key
//!   yet is held for the next tick; the relay has already forgotten it. A
//!   message that fails to open, or whose payload disagrees with the
//!   relay's routing, is dropped with a warning and does not affect its
//!   neighbours.
//! - Merging: insert by id, keep threads sorted, notify subscribers.
//!
//! Every relay call races the configured timeout on the injected
//! environment's clock, so simulated runs time out deterministically.
//!
//! Waiting for a peer key is bounded in both directions: after
//! `max_key_waits` ticks without a usable key an outbound message is
//! dropped into [`TickReport::dropped`] and an inbound one is rejected.

use std::{collections::VecDeque, future::Future, sync::Arc, time::Duration};

use murmur_core::{
    Environment, KeyDirectory, Payload, Relay, TransportError, decrypt_payload, encrypt_payload,
    new_message_id,
};
use murmur_crypto::{IdentityKeyPair, PublicKey, SECRET_KEY_SIZE};
use murmur_proto::{MailboxMessage, ParticipantId, SendRequest};
use zeroize::Zeroize;

use crate::{
    ClientError, ConversationEntry, ConversationLog, SessionKeyring,
    storage::{PersistedState, StateStore},
};

/// Engine timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Pause between ticks in [`SyncEngine::run`].
    pub poll_interval: Duration,
    /// Upper bound on a single relay call.
    pub relay_timeout: Duration,
    /// Attempts a message may wait for its peer's key before it is given
    /// up on.
    pub max_key_waits: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1200),
            relay_timeout: Duration::from_secs(5),
            max_key_waits: 50,
        }
    }
}

/// Where the engine currently is within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Between ticks.
    Idle,
    /// Flushing the outbox.
    Sending,
    /// Draining the mailbox.
    Polling,
    /// Opening drained envelopes.
    Decrypting,
    /// Inserting into the conversation log.
    Merging,
}

/// Outcome of one tick (or one outbox flush).
#[derive(Debug, Default)]
pub struct TickReport {
    /// Outbound messages accepted by the relay.
    pub sent: usize,
    /// Outbound messages left queued after a retryable failure.
    pub deferred: usize,
    /// Outbound messages dropped after a permanent failure, with the reason.
    pub dropped: Vec<(String, ClientError)>,
    /// Messages drained from the relay.
    pub received: usize,
    /// Drained messages that could not be opened or were misrouted.
    pub rejected: usize,
    /// Drained messages kept for the next tick because the sender's key is
    /// not usable yet.
    pub held: usize,
    /// Entries newly inserted into the log (sent and received).
    pub merged: usize,
    /// Set when the poll failed and the tick ended early.
    pub poll_error: Option<ClientError>,
}

impl TickReport {
    fn changed_log(&self) -> bool {
        self.merged > 0
    }
}

/// Subscriber notified for every entry inserted into the log.
pub type MessageCallback = Box<dyn FnMut(&ConversationEntry) + Send + Sync>;

/// Generate a fresh identity from the environment's CSPRNG.
pub fn generate_identity<E: Environment>(env: &E) -> IdentityKeyPair {
    let mut secret = [0u8; SECRET_KEY_SIZE];
    env.random_bytes(&mut secret);
    let identity = IdentityKeyPair::from_secret_bytes(secret);
    secret.zeroize();
    identity
}

/// Sync engine for one participant.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for time/randomness/sleep
/// - `R`: Relay the engine sends to and polls
/// - `S`: Persistence backend for threads and directory entries
pub struct SyncEngine<E: Environment, R: Relay, S: StateStore> {
    env: E,
    me: ParticipantId,
    directory: Arc<dyn KeyDirectory>,
    keyring: SessionKeyring,
    relay: R,
    store: S,
    config: SyncConfig,
    log: ConversationLog,
    outbox: VecDeque<Waiting<Payload>>,
    held: Vec<Waiting<MailboxMessage>>,
    callbacks: Vec<MessageCallback>,
    phase: SyncPhase,
}

impl<E: Environment, R: Relay, S: StateStore> SyncEngine<E, R, S> {
    /// Start an engine for `me`.
    ///
    /// Loads persisted threads and directory entries from `store`, generates
    /// a fresh identity and publishes its public key to `directory`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the saved state cannot be read
    pub fn new(
        env: E,
        me: ParticipantId,
        directory: Arc<dyn KeyDirectory>,
        relay: R,
        store: S,
        config: SyncConfig,
    ) -> Result<Self, ClientError> {
        let state = store.load()?;
        directory.restore(&state.directory)?;
        let log = ConversationLog::from_threads(state.threads);

        let identity = generate_identity(&env);
        directory.publish(me.clone(), identity.public_key());
        let keyring = SessionKeyring::new(identity, Arc::clone(&directory));

        tracing::info!(participant = %me, threads = log.thread_count(), "sync engine started");

        Ok(Self {
            env,
            me,
            directory,
            keyring,
            relay,
            store,
            config,
            log,
            outbox: VecDeque::new(),
            held: Vec::new(),
            callbacks: Vec::new(),
            phase: SyncPhase::Idle,
        })
    }

    /// The local participant.
    pub fn participant(&self) -> &ParticipantId {
        &self.me
    }

    /// Our published public key.
    pub fn public_key(&self) -> Option<PublicKey> {
        self.keyring.public_key()
    }

    /// Session key cache, for inspection.
    pub fn keyring(&self) -> &SessionKeyring {
        &self.keyring
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Messages waiting to be handed to the relay.
    pub fn outbox_len(&self) -> usize {
        self.outbox.len()
    }

    /// Drained messages waiting for their sender's key.
    pub fn held_len(&self) -> usize {
        self.held.len()
    }

    /// Every participant with a published key, in ascending order.
    pub fn list_identities(&self) -> Vec<ParticipantId> {
        self.directory.participants()
    }

    /// Our thread with `peer`, oldest first. Empty if we never talked.
    pub fn get_thread(&self, peer: &ParticipantId) -> &[ConversationEntry] {
        self.log.thread(&self.me, peer)
    }

    /// Whole local log.
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Register a subscriber for newly inserted entries, ours and peers'.
    pub fn on_new_message(
        &mut self,
        callback: impl FnMut(&ConversationEntry) + Send + Sync + 'static,
    ) {
        self.callbacks.push(Box::new(callback));
    }

    /// Queue a message to `to` and flush the outbox immediately.
    ///
    /// Surrounding whitespace is trimmed from `text`. Returns the message
    /// id. A message that could not be delivered for a retryable reason
    /// (peer key not yet published, relay down) stays queued and is retried
    /// on every tick.
    ///
    /// # Errors
    ///
    /// - `ClientError::EmptyMessage` if nothing is left after trimming;
    ///   nothing is queued
    /// - `ClientError::BadRequest` if the relay rejected this message; it is
    ///   not retried
    pub async fn send_message(
        &mut self,
        to: &ParticipantId,
        text: impl AsRef<str>,
    ) -> Result<String, ClientError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let payload = Payload {
            message_id: new_message_id(&self.env),
            sender_id: self.me.clone(),
            recipient_id: to.clone(),
            text: text.to_owned(),
            timestamp: self.env.unix_millis(),
        };
        let message_id = payload.message_id.clone();
        tracing::debug!(to = %to, id = %message_id, "queued message");
        self.outbox.push_back(Waiting::new(payload));

        let mut report = TickReport::default();
        self.flush_outbox(&mut report).await;
        self.phase = SyncPhase::Idle;
        if report.changed_log() {
            self.persist();
        }

        match report.dropped.into_iter().find(|(id, _)| *id == message_id) {
            Some((_, err)) => Err(err),
            None => Ok(message_id),
        }
    }

    /// Run one full tick: flush, poll, decrypt, merge.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        self.flush_outbox(&mut report).await;

        self.phase = SyncPhase::Polling;
        let inbound = match self.call_relay(self.relay.receive(&self.me)).await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(participant = %self.me, "poll failed, ending tick: {}", err);
                report.poll_error = Some(err);
                self.finish_tick(&report);
                return report;
            },
        };
        report.received = inbound.len();

        self.phase = SyncPhase::Decrypting;
        let mut pending = std::mem::take(&mut self.held);
        pending.extend(inbound.into_iter().map(Waiting::new));
        let mut opened = Vec::with_capacity(pending.len());
        for mut waiting in pending {
            match self.open(&waiting.item) {
                Ok(entry) => opened.push(entry),
                Err(err) if is_key_wait(&err) && waiting.waits < self.config.max_key_waits => {
                    tracing::debug!(from = %waiting.item.from, "holding inbound message: {}", err);
                    waiting.waits += 1;
                    self.held.push(waiting);
                },
                Err(err) => {
                    tracing::warn!(
                        participant = %self.me,
                        from = %waiting.item.from,
                        "dropping inbound message: {}",
                        err
                    );
                    report.rejected += 1;
                },
            }
        }
        report.held = self.held.len();

        self.phase = SyncPhase::Merging;
        for entry in opened {
            self.insert(entry, &mut report);
        }

        self.finish_tick(&report);
        report
    }

    /// Tick every `poll_interval` until `shutdown` resolves.
    ///
    /// Shutdown is observed between ticks, so a tick that has drained the
    /// mailbox always completes its merge.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        let mut shutdown = std::pin::pin!(shutdown);
        tracing::info!(participant = %self.me, "sync loop running");
        loop {
            self.tick().await;
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = self.env.sleep(self.config.poll_interval) => {},
            }
        }
        tracing::info!(participant = %self.me, "sync loop stopped");
    }

    async fn flush_outbox(&mut self, report: &mut TickReport) {
        self.phase = SyncPhase::Sending;
        let mut pending = std::mem::take(&mut self.outbox);

        while let Some(mut waiting) = pending.pop_front() {
            let payload = &waiting.item;
            match self.deliver(payload).await {
                Ok(()) => {
                    report.sent += 1;
                    tracing::debug!(to = %payload.recipient_id, id = %payload.message_id, "sent");
                    let payload = waiting.item;
                    let entry = ConversationEntry {
                        id: payload.message_id,
                        from: payload.sender_id,
                        to: payload.recipient_id,
                        text: payload.text,
                        timestamp: payload.timestamp,
                    };
                    self.insert(entry, report);
                },
                Err(err @ (ClientError::TransportTimeout | ClientError::Transport { .. })) => {
                    // The relay is unhealthy; keep this and everything behind it.
                    tracing::warn!(to = %payload.recipient_id, "send failed, will retry: {}", err);
                    report.deferred += 1 + pending.len();
                    self.outbox.push_back(waiting);
                    self.outbox.append(&mut pending);
                },
                Err(err) if is_key_wait(&err) && waiting.waits < self.config.max_key_waits => {
                    tracing::debug!(to = %payload.recipient_id, "send deferred: {}", err);
                    report.deferred += 1;
                    waiting.waits += 1;
                    self.outbox.push_back(waiting);
                },
                Err(err) => {
                    tracing::warn!(to = %payload.recipient_id, "dropping outbound: {}", err);
                    report.dropped.push((waiting.item.message_id, err));
                },
            }
        }
    }

    async fn deliver(&self, payload: &Payload) -> Result<(), ClientError> {
        let key = self.keyring.session_key(&payload.recipient_id)?;
        let envelope = encrypt_payload(&self.env, &key, payload)?;
        let request = SendRequest::new(&payload.recipient_id, &self.me, envelope);
        self.call_relay(self.relay.send(request)).await
    }

    fn open(&self, message: &MailboxMessage) -> Result<ConversationEntry, ClientError> {
        let key = self.keyring.session_key(&message.from)?;
        let payload = decrypt_payload(&key, &message.envelope)?;

        if payload.sender_id != message.from
            || payload.recipient_id != self.me
            || message.to != self.me
        {
            return Err(ClientError::MisroutedPayload {
                relay_from: message.from.clone(),
                relay_to: message.to.clone(),
                sender: payload.sender_id,
                recipient: payload.recipient_id,
            });
        }

        tracing::debug!(from = %payload.sender_id, id = %payload.message_id, "received");
        Ok(ConversationEntry {
            id: payload.message_id,
            from: payload.sender_id,
            to: payload.recipient_id,
            text: payload.text,
            timestamp: payload.timestamp,
        })
    }

    fn insert(&mut self, entry: ConversationEntry, report: &mut TickReport) {
        if !self.log.merge(entry.clone()) {
            return;
        }
        report.merged += 1;
        for callback in &mut self.callbacks {
            callback(&entry);
        }
    }

    async fn call_relay<T>(
        &self,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, ClientError> {
        tokio::select! {
            biased;
            result = call => result.map_err(ClientError::from),
            () = self.env.sleep(self.config.relay_timeout) => Err(ClientError::TransportTimeout),
        }
    }

    fn finish_tick(&mut self, report: &TickReport) {
        self.phase = SyncPhase::Idle;
        if report.changed_log() {
            self.persist();
        }
    }

    fn persist(&self) {
        let state = PersistedState {
            threads: self.log.threads().clone(),
            directory: self.directory.snapshot(),
        };
        if let Err(err) = self.store.save(&state) {
            tracing::error!(participant = %self.me, "failed to persist state: {}", err);
        }
    }
}

/// A queued item and how many times it has waited for a peer key.
struct Waiting<T> {
    item: T,
    waits: u32,
}

impl<T> Waiting<T> {
    fn new(item: T) -> Self {
        Self { item, waits: 0 }
    }
}

/// Failures that clear up once the peer (re)publishes a usable key.
fn is_key_wait(err: &ClientError) -> bool {
    matches!(err, ClientError::MissingPeerKey { .. } | ClientError::InvalidPeerKey { .. })
}
