//! Local state persistence.
//!
//! The engine saves its conversation threads and the directory entries it
//! knows after every change and loads them back on construction.
//!
//! On disk ([`FileStateStore`]):
//!
//! ```text
//! <state dir>/conversations.json   {"Alice|Bob": [{id, from, to, text, timestamp}, ..]}
//! <state dir>/directory.json       {"Alice": "<b64url public key>", ..}
//! ```

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use murmur_core::DirectorySnapshot;
use murmur_proto::ThreadKey;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use crate::{ClientError, ConversationEntry};

const CONVERSATIONS_FILE: &str = "conversations.json";
const DIRECTORY_FILE: &str = "directory.json";

/// Everything a client keeps between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Conversation threads by thread key.
    pub threads: BTreeMap<ThreadKey, Vec<ConversationEntry>>,
    /// Known public keys.
    pub directory: DirectorySnapshot,
}

/// Storage backend for [`PersistedState`].
pub trait StateStore: Send + Sync {
    /// Load the last saved state. A store that was never written yields the
    /// default (empty) state.
    fn load(&self) -> Result<PersistedState, ClientError>;

    /// Replace the saved state.
    fn save(&self, state: &PersistedState) -> Result<(), ClientError>;
}

/// In-memory store. Clones share the same slot, so a test can hand one clone
/// to an engine and inspect or reuse it through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: PersistedState,
    saves: usize,
}

impl MemoryStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<PersistedState, ClientError> {
        Ok(self.inner.lock().state.clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), ClientError> {
        let mut inner = self.inner.lock();
        inner.state = state.clone();
        inner.saves += 1;
        Ok(())
    }
}

/// JSON files in a state directory, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// State directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T, ClientError> {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(storage_error(&path, &e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| storage_error(&path, &e))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ClientError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| storage_error(&path, &e))?;
        fs::write(&tmp, bytes).map_err(|e| storage_error(&tmp, &e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_error(&path, &e))
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<PersistedState, ClientError> {
        Ok(PersistedState {
            threads: self.read_json(CONVERSATIONS_FILE)?,
            directory: self.read_json(DIRECTORY_FILE)?,
        })
    }

    fn save(&self, state: &PersistedState) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir).map_err(|e| storage_error(&self.dir, &e))?;
        self.write_json(CONVERSATIONS_FILE, &state.threads)?;
        self.write_json(DIRECTORY_FILE, &state.directory)
    }
}

fn storage_error(path: &Path, err: &dyn std::fmt::Display) -> ClientError {
    ClientError::Storage { reason: format!("{}: {err}", path.display()) }
}
