//! Participant identifiers and thread keys.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ProtoError;

/// Separator between the two participants of a [`ThreadKey`].
const THREAD_SEPARATOR: char = '|';

/// Opaque, non-empty participant name.
///
/// Identifiers are compared byte-wise. The `|` character is reserved for
/// thread keys and rejected here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Validate and wrap a participant name.
    pub fn new(id: impl Into<String>) -> Result<Self, ProtoError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtoError::InvalidParticipant { id, reason: "empty" });
        }
        if id.contains(THREAD_SEPARATOR) {
            return Err(ProtoError::InvalidParticipant { id, reason: "contains '|'" });
        }
        Ok(Self(id))
    }

    /// Borrow the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ProtoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical key of the conversation between two participants.
///
/// Both orderings of a pair produce the same key: the identifiers are sorted
/// and joined with `|`, so `ThreadKey::new(a, b) == ThreadKey::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThreadKey {
    low: ParticipantId,
    high: ParticipantId,
}

impl ThreadKey {
    /// Key for the thread between `a` and `b`, in either order.
    pub fn new(a: &ParticipantId, b: &ParticipantId) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self { low: low.clone(), high: high.clone() }
    }

    /// The two participants, lower one first.
    pub fn participants(&self) -> (&ParticipantId, &ParticipantId) {
        (&self.low, &self.high)
    }

    /// Whether `id` is one of the two participants.
    pub fn contains(&self, id: &ParticipantId) -> bool {
        &self.low == id || &self.high == id
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{THREAD_SEPARATOR}{}", self.low, self.high)
    }
}

impl FromStr for ThreadKey {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtoError::InvalidThreadKey(s.to_owned());
        let (a, b) = s.split_once(THREAD_SEPARATOR).ok_or_else(invalid)?;
        let a = ParticipantId::new(a).map_err(|_| invalid())?;
        let b = ParticipantId::new(b).map_err(|_| invalid())?;
        if a > b {
            return Err(invalid());
        }
        Ok(Self::new(&a, &b))
    }
}

impl TryFrom<String> for ThreadKey {
    type Error = ProtoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThreadKey> for String {
    fn from(key: ThreadKey) -> Self {
        key.to_string()
    }
}
