//! Local conversation log.
//!
//! One thread per unordered pair of participants. Within a thread entries
//! are sorted by timestamp (oldest first) and ids are unique. Equal
//! timestamps keep arrival order.

use std::collections::BTreeMap;

use murmur_proto::{ParticipantId, ThreadKey};
use serde::{Deserialize, Serialize};

/// One message as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Message id, shared by the sender's and the recipient's copy.
    pub id: String,
    /// Author.
    pub from: ParticipantId,
    /// Reader.
    pub to: ParticipantId,
    /// Message body.
    pub text: String,
    /// Sender's clock at send time, Unix milliseconds.
    pub timestamp: u64,
}

impl ConversationEntry {
    /// The thread this entry belongs to.
    pub fn thread_key(&self) -> ThreadKey {
        ThreadKey::new(&self.from, &self.to)
    }
}

/// Threads keyed by participant pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    threads: BTreeMap<ThreadKey, Vec<ConversationEntry>>,
}

impl ConversationLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted threads.
    ///
    /// Entries are re-filed under the key derived from their own
    /// participants and merged, so a hand-edited or stale file cannot break
    /// the ordering or uniqueness of a thread.
    pub fn from_threads(threads: BTreeMap<ThreadKey, Vec<ConversationEntry>>) -> Self {
        let mut log = Self::new();
        for entry in threads.into_values().flatten() {
            log.merge(entry);
        }
        log
    }

    /// Every thread, for persistence.
    pub fn threads(&self) -> &BTreeMap<ThreadKey, Vec<ConversationEntry>> {
        &self.threads
    }

    /// Insert `entry` unless its id is already present in the thread.
    ///
    /// Returns whether the entry was inserted.
    pub fn merge(&mut self, entry: ConversationEntry) -> bool {
        let thread = self.threads.entry(entry.thread_key()).or_default();
        if thread.iter().any(|existing| existing.id == entry.id) {
            return false;
        }

        // Insert after every entry with timestamp <= ours, which keeps the
        // sort stable for equal timestamps.
        let position = thread.partition_point(|existing| existing.timestamp <= entry.timestamp);
        thread.insert(position, entry);
        true
    }

    /// Entries exchanged between `a` and `b`, oldest first. Empty if the
    /// two never talked.
    pub fn thread(&self, a: &ParticipantId, b: &ParticipantId) -> &[ConversationEntry] {
        self.threads.get(&ThreadKey::new(a, b)).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of non-empty threads.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}
