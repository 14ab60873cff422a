//! # Alerts Store
//!
//! Each Quick Shield alert becomes one pretty-printed JSON file named
//! `alert-<id>.json`. The document is written to a hidden temporary file
//! first and renamed into place, so a reader never sees a half-written
//! alert and a failed write leaves nothing behind under the final name.

use super::{IdGenerator, StorageError};
use crate::records::AlertRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::warn;

/// Where an alert ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAlert {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Clone)]
pub struct AlertStore {
    dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl AlertStore {
    pub fn new(dir: impl Into<PathBuf>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { dir: dir.into(), ids }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize `alert` and persist it under a fresh `alert-<id>.json`.
    pub async fn save(&self, alert: &AlertRecord) -> Result<StoredAlert, StorageError> {
        let document = serde_json::to_string_pretty(alert)?;

        let filename = format!("alert-{}.json", self.ids.next_id());
        let path = self.dir.join(&filename);
        let staging = self.dir.join(format!(".{}.tmp", filename));

        if let Err(e) = fs::write(&staging, document.as_bytes()).await {
            discard(&staging).await;
            return Err(StorageError::io(&staging, e));
        }

        if let Err(e) = fs::rename(&staging, &path).await {
            discard(&staging).await;
            return Err(StorageError::io(&path, e));
        }

        Ok(StoredAlert { filename, path })
    }
}

async fn discard(staging: &Path) {
    match fs::remove_file(staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staging.display(), error = %e, "Failed to remove staged alert"),
    }
}
