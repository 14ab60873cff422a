//! # Recordings Store
//!
//! Uploaded audio is streamed straight to disk, chunk by chunk, under a
//! generated name of the form `recording-<id><ext>`. The bytes are never
//! inspected or transcoded.
//!
//! ## Lifecycle of an upload:
//! 1. [`RecordingStore::filename_for`] checks the client extension and picks a name
//! 2. [`RecordingStore::create`] opens the new file (never overwriting an existing one)
//! 3. [`RecordingWriter::write_chunk`] appends each multipart chunk as it arrives
//! 4. [`RecordingWriter::finish`] flushes and reports what was stored,
//!    or [`RecordingWriter::abort`] removes the partial file

use super::{IdGenerator, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// A recording that has been fully written to the recordings directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecording {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Writes uploaded audio into the recordings directory.
#[derive(Clone)]
pub struct RecordingStore {
    dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
    allowed_extensions: Vec<String>,
}

impl RecordingStore {
    /// `allowed_extensions` are expected lowercase and without the leading dot.
    pub fn new(dir: impl Into<PathBuf>, ids: Arc<dyn IdGenerator>, allowed_extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            ids,
            allowed_extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Work out the extension to keep from a client-supplied filename.
    ///
    /// Only the last path component is looked at, so `../../x.wav` and
    /// `C:\clips\x.wav` both reduce to `.wav`. The result is lowercase with a
    /// leading dot, or empty when the filename has no extension (browsers
    /// often upload MediaRecorder output as plain `blob`).
    pub fn extension_for(&self, original: Option<&str>) -> Result<String, StorageError> {
        let Some(original) = original else {
            return Ok(String::new());
        };

        let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
        let Some(ext) = Path::new(base).extension().and_then(|ext| ext.to_str()) else {
            return Ok(String::new());
        };

        let ext = ext.to_ascii_lowercase();
        if self.allowed_extensions.iter().any(|allowed| *allowed == ext) {
            Ok(format!(".{}", ext))
        } else {
            Err(StorageError::UnsupportedExtension(ext))
        }
    }

    /// Generate the stored filename for an upload.
    pub fn filename_for(&self, original: Option<&str>) -> Result<String, StorageError> {
        let ext = self.extension_for(original)?;
        Ok(format!("recording-{}{}", self.ids.next_id(), ext))
    }

    /// Open a brand new file for `filename` inside the recordings directory.
    ///
    /// `create_new` makes an existing file an error instead of silently
    /// replacing someone else's recording.
    pub async fn create(&self, filename: &str) -> Result<RecordingWriter, StorageError> {
        let path = self.dir.join(filename);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        Ok(RecordingWriter {
            file,
            filename: filename.to_string(),
            path,
            bytes_written: 0,
        })
    }
}

/// An open recording file that is still receiving bytes.
pub struct RecordingWriter {
    file: File,
    filename: String,
    path: PathBuf,
    bytes_written: u64,
}

impl RecordingWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush everything to disk and close the file.
    ///
    /// If the flush fails the partial file is removed before returning.
    pub async fn finish(mut self) -> Result<StoredRecording, StorageError> {
        let flushed = match self.file.flush().await {
            Ok(()) => self.file.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = flushed {
            let path = self.path.clone();
            self.abort().await;
            return Err(StorageError::io(path, e));
        }

        Ok(StoredRecording {
            filename: self.filename,
            path: self.path,
            size: self.bytes_written,
        })
    }

    /// Close and delete the partially written file.
    pub async fn abort(self) {
        let RecordingWriter { file, path, .. } = self;
        drop(file);
        if let Err(e) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove partial recording");
        }
    }
}
