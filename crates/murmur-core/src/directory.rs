//! Public key directory.
//!
//! Maps participant ids to their published X25519 public keys. Publishing
//! overwrites any earlier entry (last write wins). A missing entry is a
//! retryable condition: the peer may simply not have published yet.

use std::collections::BTreeMap;

use murmur_crypto::PublicKey;
use murmur_proto::{ParticipantId, b64};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::DirectoryError;

/// Serializable copy of a directory: participant id to base64url public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectorySnapshot(pub BTreeMap<ParticipantId, String>);

/// Lookup and publication of participant public keys.
///
/// Shared between every engine of a process; implementations are
/// internally synchronized.
pub trait KeyDirectory: Send + Sync {
    /// Publish `key` for `participant`, replacing any earlier key.
    fn publish(&self, participant: ParticipantId, key: PublicKey);

    /// Current key of `participant`.
    ///
    /// # Errors
    ///
    /// - `DirectoryError::NotFound` if nothing has been published
    fn lookup(&self, participant: &ParticipantId) -> Result<PublicKey, DirectoryError>;

    /// All participants with a published key, in ascending order.
    fn participants(&self) -> Vec<ParticipantId>;

    /// Copy of every entry.
    fn snapshot(&self) -> DirectorySnapshot;

    /// Fill in entries from `snapshot` for participants with no current key.
    ///
    /// Keys already published win over restored ones, so a stale snapshot
    /// never replaces a live identity. Entries are validated before any is
    /// applied; a corrupt snapshot leaves the directory unchanged.
    fn restore(&self, snapshot: &DirectorySnapshot) -> Result<(), DirectoryError>;
}

/// In-memory directory behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    keys: RwLock<BTreeMap<ParticipantId, PublicKey>>,
}

impl MemoryDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of published entries.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl KeyDirectory for MemoryDirectory {
    fn publish(&self, participant: ParticipantId, key: PublicKey) {
        tracing::debug!(%participant, ?key, "publishing public key");
        self.keys.write().insert(participant, key);
    }

    fn lookup(&self, participant: &ParticipantId) -> Result<PublicKey, DirectoryError> {
        self.keys
            .read()
            .get(participant)
            .copied()
            .ok_or_else(|| DirectoryError::NotFound(participant.clone()))
    }

    fn participants(&self) -> Vec<ParticipantId> {
        self.keys.read().keys().cloned().collect()
    }

    fn snapshot(&self) -> DirectorySnapshot {
        DirectorySnapshot(
            self.keys
                .read()
                .iter()
                .map(|(participant, key)| (participant.clone(), b64::encode(key.as_bytes())))
                .collect(),
        )
    }

    fn restore(&self, snapshot: &DirectorySnapshot) -> Result<(), DirectoryError> {
        let mut decoded = Vec::with_capacity(snapshot.0.len());
        for (participant, encoded) in &snapshot.0 {
            let corrupt = |reason: String| DirectoryError::Corrupt {
                participant: participant.clone(),
                reason,
            };
            let bytes = b64::decode(encoded).map_err(|e| corrupt(e.to_string()))?;
            let key = PublicKey::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
            decoded.push((participant.clone(), key));
        }

        let mut keys = self.keys.write();
        for (participant, key) in decoded {
            keys.entry(participant).or_insert(key);
        }
        Ok(())
    }
}
