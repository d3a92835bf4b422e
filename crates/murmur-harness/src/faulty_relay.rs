//! Relay wrapper with injectable faults.

use std::sync::atomic::{AtomicUsize, Ordering};

use arbitrary::Arbitrary;
use async_trait::async_trait;
use murmur_core::{Relay, TransportError};
use murmur_proto::{MailboxMessage, ParticipantId, SendRequest};
use parking_lot::Mutex;

/// How the wrapped relay misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Arbitrary)]
pub enum FaultMode {
    /// Forward every call.
    #[default]
    Healthy,
    /// Fail every call as unreachable.
    Down,
    /// Never answer. The caller's timeout is the only way out.
    Hang,
}

/// [`Relay`] that forwards to `inner` unless told to fail.
///
/// Tampering flips one ciphertext bit of forwarded envelopes, the way an
/// active attacker on the path between client and relay would.
#[derive(Debug)]
pub struct FaultyRelay<R> {
    inner: R,
    mode: Mutex<FaultMode>,
    tamper_sends: AtomicUsize,
    sends: AtomicUsize,
    receives: AtomicUsize,
}

impl<R: Relay> FaultyRelay<R> {
    /// Healthy wrapper around `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            mode: Mutex::new(FaultMode::Healthy),
            tamper_sends: AtomicUsize::new(0),
            sends: AtomicUsize::new(0),
            receives: AtomicUsize::new(0),
        }
    }

    /// Wrapped relay.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Switch fault mode.
    pub fn set_mode(&self, mode: FaultMode) {
        *self.mode.lock() = mode;
    }

    /// Current fault mode.
    pub fn mode(&self) -> FaultMode {
        *self.mode.lock()
    }

    /// Corrupt the envelopes of the next `count` forwarded sends.
    pub fn tamper_next_sends(&self, count: usize) {
        self.tamper_sends.store(count, Ordering::SeqCst);
    }

    /// Send calls seen, including failed ones.
    pub fn send_calls(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Receive calls seen, including failed ones.
    pub fn receive_calls(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    fn take_tamper(&self) -> bool {
        self.tamper_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<R: Relay> Relay for FaultyRelay<R> {
    async fn send(&self, mut request: SendRequest) -> Result<(), TransportError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            FaultMode::Healthy => {},
            FaultMode::Down => return Err(TransportError::Unreachable("relay down".to_owned())),
            FaultMode::Hang => return std::future::pending().await,
        }

        if self.take_tamper()
            && let Some(byte) =
                request.envelope.as_mut().and_then(|envelope| envelope.ciphertext.first_mut())
        {
            *byte ^= 0x01;
        }
        self.inner.send(request).await
    }

    async fn receive(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<MailboxMessage>, TransportError> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            FaultMode::Healthy => self.inner.receive(participant).await,
            FaultMode::Down => Err(TransportError::Unreachable("relay down".to_owned())),
            FaultMode::Hang => std::future::pending().await,
        }
    }
}
