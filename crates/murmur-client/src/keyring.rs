//! Per-peer session key cache.
//!
//! Holds the local identity and derives one session key per peer on first
//! use. Derivation runs under the cache lock, so concurrent callers asking
//! for the same peer never derive twice. Cached keys are never invalidated:
//! identities live as long as the engine.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use murmur_core::KeyDirectory;
use murmur_crypto::{CryptoError, IdentityKeyPair, PublicKey, SessionKey, derive_session_key};
use murmur_proto::ParticipantId;
use parking_lot::Mutex;

use crate::ClientError;

/// Local identity plus the session keys derived from it.
pub struct SessionKeyring {
    identity: Option<IdentityKeyPair>,
    directory: Arc<dyn KeyDirectory>,
    keys: Mutex<HashMap<ParticipantId, Arc<SessionKey>>>,
    derivations: AtomicUsize,
}

impl SessionKeyring {
    /// Keyring for `identity`, resolving peers through `directory`.
    pub fn new(identity: IdentityKeyPair, directory: Arc<dyn KeyDirectory>) -> Self {
        Self::build(Some(identity), directory)
    }

    /// Keyring with no local identity. Every derivation fails with
    /// `ClientError::MissingOwnIdentity`.
    pub fn without_identity(directory: Arc<dyn KeyDirectory>) -> Self {
        Self::build(None, directory)
    }

    fn build(identity: Option<IdentityKeyPair>, directory: Arc<dyn KeyDirectory>) -> Self {
        Self {
            identity,
            directory,
            keys: Mutex::new(HashMap::new()),
            derivations: AtomicUsize::new(0),
        }
    }

    /// Public half of the local identity.
    pub fn public_key(&self) -> Option<PublicKey> {
        self.identity.as_ref().map(IdentityKeyPair::public_key)
    }

    /// Session key shared with `peer`, derived on first use.
    ///
    /// # Errors
    ///
    /// - `ClientError::MissingOwnIdentity` if no identity is installed
    /// - `ClientError::MissingPeerKey` if `peer` has not published a key
    /// - `ClientError::InvalidPeerKey` if the published key has low order
    pub fn session_key(&self, peer: &ParticipantId) -> Result<Arc<SessionKey>, ClientError> {
        let mut keys = self.keys.lock();
        if let Some(key) = keys.get(peer) {
            return Ok(Arc::clone(key));
        }

        let identity = self.identity.as_ref().ok_or(ClientError::MissingOwnIdentity)?;
        let peer_public = self.directory.lookup(peer)?;
        let key = derive_session_key(identity, &peer_public).map_err(|err| {
            let reason = match err {
                CryptoError::InvalidKey(reason) => reason,
                other => other.to_string(),
            };
            ClientError::InvalidPeerKey { peer: peer.clone(), reason }
        })?;

        self.derivations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%peer, "derived session key");

        let key = Arc::new(key);
        keys.insert(peer.clone(), Arc::clone(&key));
        Ok(key)
    }

    /// Number of successful derivations so far.
    pub fn derivation_count(&self) -> usize {
        self.derivations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread;

    use murmur_core::MemoryDirectory;

    use super::*;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn setup() -> (Arc<MemoryDirectory>, SessionKeyring, SessionKeyring) {
        let directory = Arc::new(MemoryDirectory::new());
        let alice = IdentityKeyPair::from_secret_bytes([1; 32]);
        let bob = IdentityKeyPair::from_secret_bytes([2; 32]);
        directory.publish(id("Alice"), alice.public_key());
        directory.publish(id("Bob"), bob.public_key());
        let shared: Arc<dyn KeyDirectory> = directory.clone();
        let alice = SessionKeyring::new(alice, Arc::clone(&shared));
        let bob = SessionKeyring::new(bob, shared);
        (directory, alice, bob)
    }

    #[test]
    fn both_sides_agree() {
        let (_, alice, bob) = setup();
        let from_alice = alice.session_key(&id("Bob")).unwrap();
        let from_bob = bob.session_key(&id("Alice")).unwrap();
        assert_eq!(*from_alice, *from_bob);
    }

    #[test]
    fn derives_once_per_peer() {
        let (_, alice, _) = setup();
        let first = alice.session_key(&id("Bob")).unwrap();
        let second = alice.session_key(&id("Bob")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(alice.derivation_count(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_derivation() {
        let (_, alice, _) = setup();
        let alice = Arc::new(alice);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alice = Arc::clone(&alice);
                thread::spawn(move || alice.session_key(&id("Bob")).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(alice.derivation_count(), 1);
    }

    #[test]
    fn missing_peer_then_published() {
        let (directory, alice, _) = setup();
        let err = alice.session_key(&id("Carol")).unwrap_err();
        assert!(matches!(err, ClientError::MissingPeerKey { ref peer } if *peer == id("Carol")));
        assert!(err.is_retryable());

        directory.publish(id("Carol"), IdentityKeyPair::from_secret_bytes([3; 32]).public_key());
        assert!(alice.session_key(&id("Carol")).is_ok());
    }

    #[test]
    fn missing_identity_is_fatal() {
        let keyring = SessionKeyring::without_identity(Arc::new(MemoryDirectory::new()));
        let err = keyring.session_key(&id("Bob")).unwrap_err();
        assert!(err.is_fatal());
        assert!(keyring.public_key().is_none());
    }

    #[test]
    fn low_order_key_is_rejected() {
        let (directory, alice, _) = setup();
        directory.publish(id("Mallory"), PublicKey::from_bytes([0; 32]));
        assert!(matches!(
            alice.session_key(&id("Mallory")),
            Err(ClientError::InvalidPeerKey { .. })
        ));
        assert_eq!(alice.derivation_count(), 0);
    }
}
