//! Whole-state snapshots.
//!
//! A snapshot is a version tag followed by the serialized [`TicketingState`],
//! encoded with `bincode`. The session is never part of it.
//!
//! Stores write atomically: a reader sees either the previous snapshot or the
//! complete new one.

use crate::state::TicketingState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Current schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Versioned snapshot envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version, see [`SNAPSHOT_VERSION`]
    pub version: u32,
    /// Full state
    pub state: TicketingState,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a TicketingState,
}

/// Snapshot failures.
///
/// Only [`SnapshotError::NotFound`] is an ordinary outcome; everything else
/// is fatal to the operation that hit it.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// No snapshot under that name
    #[error("Snapshot not found: {name}")]
    NotFound {
        /// Requested snapshot
        name: String,
    },

    /// Any other I/O failure
    #[error("Snapshot I/O failed for {name}: {source}")]
    Io {
        /// Requested snapshot
        name: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Bytes could not be encoded or decoded
    #[error("Snapshot codec failed: {0}")]
    Codec(#[from] bincode::Error),

    /// Written by an incompatible schema
    #[error("Unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the blob
        found: u32,
        /// Version this build understands
        expected: u32,
    },
}

impl SnapshotError {
    fn io(name: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { name: name.to_string() }
        } else {
            Self::Io {
                name: name.to_string(),
                source,
            }
        }
    }
}

/// Encodes `state` into a snapshot blob
///
/// # Errors
///
/// Returns [`SnapshotError::Codec`] if serialization fails.
pub fn encode(state: &TicketingState) -> Result<Vec<u8>, SnapshotError> {
    let envelope = SnapshotRef {
        version: SNAPSHOT_VERSION,
        state,
    };
    Ok(bincode::serialize(&envelope)?)
}

/// Decodes a snapshot blob.
///
/// The version is read first so an incompatible blob is reported as such
/// rather than as corrupt data.
///
/// # Errors
///
/// - [`SnapshotError::UnsupportedVersion`] for other schema versions
/// - [`SnapshotError::Codec`] for corrupt data
pub fn decode(bytes: &[u8]) -> Result<TicketingState, SnapshotError> {
    let version: u32 = bincode::deserialize(bytes)?;
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }
    let snapshot: Snapshot = bincode::deserialize(bytes)?;
    Ok(snapshot.state)
}

/// Where snapshot blobs live
pub trait SnapshotStore: Send + Sync {
    /// Atomically replaces the blob stored under `name`
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] on any write failure.
    fn save(&self, name: &str, bytes: &[u8]) -> Result<(), SnapshotError>;

    /// Reads the blob stored under `name`
    ///
    /// # Errors
    ///
    /// [`SnapshotError::NotFound`] if nothing is stored, [`SnapshotError::Io`]
    /// otherwise.
    fn load(&self, name: &str) -> Result<Vec<u8>, SnapshotError>;
}

/// Snapshots as files in one directory
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Stores files under `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshots
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        let path = self.path_for(name);
        let tmp = path.with_extension("tmp");

        fs::create_dir_all(&self.dir).map_err(|e| SnapshotError::io(name, e))?;
        fs::write(&tmp, bytes).map_err(|e| SnapshotError::io(name, e))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            SnapshotError::Io {
                name: name.to_string(),
                source: e,
            }
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>, SnapshotError> {
        fs::read(self.path_for(name)).map_err(|e| SnapshotError::io(name, e))
    }
}

/// In-memory store for tests and demos
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of stored snapshots
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>, SnapshotError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SnapshotError::NotFound { name: name.to_string() })
    }
}
