//! # Local Disk Storage
//!
//! Recordings and alerts are persisted as one flat file per event. This
//! module owns everything that touches those directories:
//!
//! - **paths**: resolving and creating the storage directories at startup
//! - **ids**: the identifier generator that names every stored file
//! - **recordings**: streaming uploaded audio to `recordings/`
//! - **alerts**: writing Quick Shield alerts to `alerts/`
//!
//! Stores never build HTTP responses. They return [`StorageError`] and the
//! handlers decide what the client sees.

pub mod alerts;
pub mod ids;
pub mod paths;
pub mod recordings;

pub use alerts::AlertStore;
pub use ids::{IdGenerator, MonotonicMillis};
pub use paths::StoragePaths;
pub use recordings::{RecordingStore, StoredRecording};

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while persisting a recording or an alert.
///
/// ## Variants:
/// - **Io**: the filesystem refused a create, write, flush or rename
/// - **Serialize**: an alert could not be turned into JSON
/// - **UnsupportedExtension**: the client filename carries an extension outside the allow-list
#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
    Serialize(serde_json::Error),
    UnsupportedExtension(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            StorageError::Serialize(err) => write!(f, "Serialization error: {}", err),
            StorageError::UnsupportedExtension(ext) => {
                write!(f, "Unsupported audio extension '.{}'", ext)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Serialize(err) => Some(err),
            StorageError::UnsupportedExtension(_) => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialize(err)
    }
}
