//! Local filesystem storage for recordings.
//!
//! Uploads never write to their final path directly. Bytes go to a hidden `.<uuid>.part` file in
//! the upload directory and [`PendingRecording::commit`] renames it onto the derived filename.
//! Rename within one directory is atomic, so a reader sees either the previous recording or the
//! complete new one, and two uploads racing for the same name never interleave. A pending
//! recording that is dropped without being committed (validation failure, I/O error, client
//! disconnect) removes its temporary file.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{Error, Result};

const PARTIAL_EXTENSION: &str = "part";

/// A recording persisted to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mimetype: String,
}

/// Upload directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    /// Resolve `dir` against the working directory and create it (recursively) if missing.
    pub async fn init(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = std::path::absolute(dir.as_ref())?;
        fs::create_dir_all(&dir).await?;
        debug!(upload_dir = %dir.display(), "Upload directory ready");
        Ok(Self { dir })
    }

    /// Absolute path of the upload directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open a temporary file for a new upload.
    pub async fn begin(&self, mimetype: impl Into<String>) -> Result<PendingRecording> {
        let temp_path = self.dir.join(format!(".{}.{PARTIAL_EXTENSION}", Uuid::new_v4()));
        let file = fs::File::create(&temp_path).await?;

        Ok(PendingRecording {
            dir: self.dir.clone(),
            temp_path,
            file: Some(file),
            size_bytes: 0,
            mimetype: mimetype.into(),
            committed: false,
        })
    }
}

/// An upload in progress. Dropping it without calling [`commit`](Self::commit) discards the bytes.
#[derive(Debug)]
pub struct PendingRecording {
    dir: PathBuf,
    temp_path: PathBuf,
    file: Option<fs::File>,
    size_bytes: u64,
    mimetype: String,
    committed: bool,
}

impl PendingRecording {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::Internal {
                operation: "write to a closed recording".to_string(),
            });
        };
        file.write_all(chunk).await?;
        self.size_bytes += chunk.len() as u64;
        Ok(())
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    /// Flush the temporary file to disk and move it to `<upload_dir>/<filename>`, replacing any
    /// existing file of that name.
    pub async fn commit(mut self, filename: &str) -> Result<StoredFile> {
        if !is_single_component(filename) {
            return Err(Error::BadRequest {
                message: format!("Invalid recording filename: {filename}"),
            });
        }

        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        let target = self.dir.join(filename);
        fs::rename(&self.temp_path, &target).await?;
        self.committed = true;

        Ok(StoredFile {
            filename: filename.to_string(),
            path: target,
            size_bytes: self.size_bytes,
            mimetype: std::mem::take(&mut self.mimetype),
        })
    }
}

impl Drop for PendingRecording {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close the handle before unlinking. `Drop` cannot await, so this is a blocking unlink on
        // the calling worker thread.
        self.file.take();
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => debug!(temp_path = %self.temp_path.display(), "Discarded partial upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(temp_path = %self.temp_path.display(), error = %e, "Failed to discard partial upload"),
        }
    }
}

/// A derived filename must name a file directly inside the upload directory.
fn is_single_component(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}
