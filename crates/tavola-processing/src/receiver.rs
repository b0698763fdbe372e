//! Temporary-file receiver
//!
//! Uploaded bytes land here first, under a collision-resistant generated
//! name. The caller owns the stored file until the generator has consumed it
//! and must discard it afterwards, success or failure.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("failed to create temp directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to a file held in temporary storage.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub generated_filename: String,
    pub original_filename: String,
}

/// Temporary storage for in-flight uploads.
#[derive(Debug, Clone)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Create a store rooted at `root`, creating the directory tree if absent.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, ReceiverError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| ReceiverError::CreateDir {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `data` under a generated name: unix millis, a random suffix, and
    /// the original extension. The directory is re-created lazily so the
    /// store survives an external cleanup of the temp tree; `create_dir_all`
    /// is idempotent and safe under concurrent racers.
    pub async fn store(
        &self,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredUpload, ReceiverError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| ReceiverError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let extension = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let generated_filename = format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        );
        let path = self.root.join(&generated_filename);

        fs::write(&path, data)
            .await
            .map_err(|source| ReceiverError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            original_filename = %original_filename,
            "Stored upload in temp storage"
        );

        Ok(StoredUpload {
            path,
            generated_filename,
            original_filename: original_filename.to_string(),
        })
    }

    /// Remove the temp file. Tolerant of the file already being gone; other
    /// failures are logged, not propagated, since discard runs on both the
    /// success and the failure path.
    pub async fn discard(&self, upload: &StoredUpload) {
        match fs::remove_file(&upload.path).await {
            Ok(()) => {
                tracing::debug!(path = %upload.path.display(), "Discarded temp upload");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %upload.path.display(),
                    "Failed to discard temp upload"
                );
            }
        }
    }
}
