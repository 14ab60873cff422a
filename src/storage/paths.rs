//! Storage directory layout.
//!
//! Configuration names the directories; [`StoragePaths`] resolves them once
//! at startup and creates the ones the service writes into.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolved storage directories, computed once from configuration and
/// handed to the stores and handlers that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub recordings: PathBuf,
    pub alerts: PathBuf,
    pub public: PathBuf,
    pub index_document: PathBuf,
}

impl StoragePaths {
    pub fn from_config(config: &AppConfig) -> Self {
        let public = config.public_path();
        Self {
            recordings: config.recordings_path(),
            alerts: config.alerts_path(),
            index_document: public.join(&config.storage.index_document),
            public,
        }
    }

    /// Create the recordings and alerts directories if they are missing.
    ///
    /// The public directory is content shipped with the front end, so it is
    /// never created here.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.recordings, &self.alerts] {
            create_if_missing(dir)?;
        }
        Ok(())
    }
}

fn create_if_missing(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
    info!(dir = %dir.display(), "Created storage directory");
    Ok(())
}
