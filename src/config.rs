//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix, plus the bare HOST and PORT)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Converts between Rust structs and TOML / environment data
//! - **derive macros**: Generate Debug, Clone, Serialize, Deserialize for us
//! - **Path / PathBuf**: Borrowed and owned filesystem paths
//! - **Result<T, E>**: Every loading step can fail and must be handled
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` environment variables (deployment platforms set these)
//! 2. Environment variables such as `APP_SERVER__PORT` or `APP_STORAGE__BASE_DIR`
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration that contains all settings.
///
/// ## Sections:
/// - `server`: where the HTTP listener binds
/// - `storage`: where recordings, alerts and public assets live on disk
/// - `uploads`: what kind of audio files the upload endpoint accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "0.0.0.0"`: Accept connections from any interface (the default, so phones on the LAN can reach it)
/// - `host = "127.0.0.1"`: Only accept local connections
/// - `port = 3000`: Default listening port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Storage layout on disk.
///
/// ## Fields:
/// - `base_dir`: Directory the relative paths below are resolved against
/// - `recordings_dir`: Uploaded audio files (`recording-<id>.<ext>`)
/// - `alerts_dir`: Persisted Quick Shield alerts (`alert-<id>.json`)
/// - `public_dir`: Static assets served as-is
/// - `index_document`: File inside `public_dir` returned for `GET /`
///
/// Absolute paths in any of the `*_dir` fields are used unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
    pub recordings_dir: PathBuf,
    pub alerts_dir: PathBuf,
    pub public_dir: PathBuf,
    pub index_document: String,
}

/// Upload restrictions.
///
/// ## Why an allow-list:
/// The stored filename reuses the extension the client sent. Restricting it
/// to known audio extensions keeps client input out of the path beyond a
/// short, well-known suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Lowercase extensions without the leading dot (e.g. "wav", "webm")
    pub allowed_extensions: Vec<String>,
}

/// Default extensions produced by browsers' MediaRecorder and common recorders.
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "webm", "weba", "ogg", "oga", "opus", "m4a", "mp4", "aac", "flac",
];

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// The service must start with zero configuration: port 3000, and the
/// `recordings/`, `alerts/` and `public/` directories next to the process.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                base_dir: PathBuf::from("."),
                recordings_dir: PathBuf::from("recordings"),
                alerts_dir: PathBuf::from("alerts"),
                public_dir: PathBuf::from("public"),
                index_document: "final.html".to_string(),
            },
            uploads: UploadConfig {
                allowed_extensions: DEFAULT_AUDIO_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the bare HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=127.0.0.1`: Override server host
    /// - `APP_STORAGE__BASE_DIR=/var/lib/quick-shield`: Move all storage
    /// - `PORT=8080`: Special case for deployment platforms
    ///
    /// - `APP_UPLOADS__ALLOWED_EXTENSIONS=wav,mp3`: Replace the allow-list
    ///
    /// A double underscore separates nesting levels because field names
    /// such as `base_dir` already contain single underscores.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("uploads.allowed_extensions"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let mut config: AppConfig = settings.build()?.try_deserialize()?;
        config.uploads.normalize();
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Storage directory names and the index document are not empty
    /// - Recordings and alerts do not share a directory
    /// - The extension allow-list is not empty and holds bare extensions only
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let dirs = [
            ("recordings_dir", &self.storage.recordings_dir),
            ("alerts_dir", &self.storage.alerts_dir),
            ("public_dir", &self.storage.public_dir),
        ];
        for (name, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("storage.{} cannot be empty", name));
            }
        }

        if self.storage.index_document.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.index_document cannot be empty"));
        }

        if self.recordings_path() == self.alerts_path() {
            return Err(anyhow::anyhow!(
                "Recordings and alerts must be stored in different directories"
            ));
        }

        if self.uploads.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("uploads.allowed_extensions must list at least one extension"));
        }

        for ext in &self.uploads.allowed_extensions {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(anyhow::anyhow!(
                    "Invalid extension '{}' in uploads.allowed_extensions",
                    ext
                ));
            }
        }

        Ok(())
    }

    /// Resolved directory for uploaded recordings.
    pub fn recordings_path(&self) -> PathBuf {
        self.storage.resolve(&self.storage.recordings_dir)
    }

    /// Resolved directory for persisted alerts.
    pub fn alerts_path(&self) -> PathBuf {
        self.storage.resolve(&self.storage.alerts_dir)
    }

    /// Resolved directory for static assets.
    pub fn public_path(&self) -> PathBuf {
        self.storage.resolve(&self.storage.public_dir)
    }
}

impl StorageConfig {
    /// Join a configured directory onto `base_dir`.
    ///
    /// `Path::join` already returns the argument unchanged when it is
    /// absolute, which is exactly the behavior we want.
    fn resolve(&self, dir: &Path) -> PathBuf {
        self.base_dir.join(dir)
    }
}

impl UploadConfig {
    /// Lowercase every entry and strip a leading dot so `".WAV"` and `"wav"` mean the same thing.
    pub fn normalize(&mut self) {
        for ext in self.allowed_extensions.iter_mut() {
            *ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        }
        self.allowed_extensions.sort();
        self.allowed_extensions.dedup();
    }
}
