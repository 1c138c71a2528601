use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::model::NoteId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("note {0} not found")]
    NotFound(NoteId),
    /// The in-memory state already reflects the mutation; only the write failed.
    #[error("changes may not survive a reload: {0}")]
    Persistence(#[from] PersistenceError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o failure on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("sqlite failure")]
    Sqlite(#[from] rusqlite::Error),
    #[error("encoding note document")]
    Encode(#[source] serde_json::Error),
    #[error("decoding note document")]
    Decode(#[source] serde_json::Error),
    #[error("note document schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("storage rejected the write: {0}")]
    Rejected(String),
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}
