//! # Audio Persistence
//!
//! Stores uploaded audio blobs under the configured uploads directory so the
//! transcription client can read them back as a file. Filenames are a fresh
//! UUIDv4 per request, so concurrent uploads never collide and the directory
//! needs no locking.
//!
//! Writes go to a `.part` temp name first and are renamed into place, so a
//! concurrent reader never observes a partially written file.

use crate::error::AppError;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded audio payload as received from the multipart form.
///
/// Owned exclusively by the store until written, then discarded.
#[derive(Debug)]
pub struct UploadedAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
}

/// Opaque handle to one stored file. One handle maps to exactly one
/// physical file on disk.
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub path: PathBuf,
    pub filename: String,
}

/// Filesystem-backed store for uploaded audio.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist an upload and return its handle.
    ///
    /// The upload's declared MIME type only picks the file extension; the
    /// payload bytes are written untouched. Directory creation is
    /// idempotent. Every failure surfaces as `AppError::Storage` carrying
    /// the attempted path.
    pub async fn save(&self, upload: &UploadedAudio) -> Result<StoredAudio, AppError> {
        let filename = format!("{}.{}", Uuid::new_v4(), extension_for(&upload.mime_type));
        let path = self.root.join(&filename);
        let temp_path = self.root.join(format!("{}.part", filename));

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Storage(format!(
                "failed to create upload directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        tokio::fs::write(&temp_path, &upload.data)
            .await
            .map_err(|e| {
                AppError::Storage(format!("failed to write {}: {}", temp_path.display(), e))
            })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            AppError::Storage(format!("failed to finalize {}: {}", path.display(), e))
        })?;

        debug!(
            filename = %filename,
            bytes = upload.data.len(),
            original_name = %upload.original_name,
            "Stored uploaded audio"
        );

        Ok(StoredAudio { path, filename })
    }

    /// Delete stored uploads older than `max_age`.
    ///
    /// Best effort: unreadable entries are logged and skipped, and a missing
    /// uploads directory is not an error (nothing has been uploaded yet).
    /// Returns the number of files removed.
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<usize, AppError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "failed to read upload directory {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let cutoff = SystemTime::now() - max_age;
        let mut removed = 0usize;

        while let Ok(Some(entry)) = entries.next_entry().await.map_err(|e| {
            warn!(error = %e, "Failed to iterate upload directory");
            e
        }) {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable upload entry");
                    continue;
                }
            };

            if modified < cutoff {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove expired upload")
                    }
                }
            }
        }

        Ok(removed)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a declared MIME type to a file extension. Unknown types fall back to
/// a generic extension; the bytes themselves are never inspected (codec
/// handling is out of scope).
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> AudioStore {
        let dir = std::env::temp_dir()
            .join("speech-insight-tests")
            .join(Uuid::new_v4().to_string());
        AudioStore::new(dir)
    }

    fn mp3_upload(data: Vec<u8>) -> UploadedAudio {
        UploadedAudio {
            data,
            mime_type: "audio/mpeg".to_string(),
            original_name: "memo.mp3".to_string(),
        }
    }

    #[tokio::test]
    async fn test_saved_bytes_read_back_identical() {
        let store = scratch_store();
        let payload = vec![0u8, 1, 2, 3, 255, 128, 7];
        let handle = store.save(&mp3_upload(payload.clone())).await.unwrap();

        let read_back = tokio::fs::read(&handle.path).await.unwrap();
        assert_eq!(read_back, payload);
    }

    #[tokio::test]
    async fn test_same_logical_name_produces_distinct_handles() {
        let store = scratch_store();
        let first = store.save(&mp3_upload(vec![1, 2, 3])).await.unwrap();
        let second = store.save(&mp3_upload(vec![4, 5, 6])).await.unwrap();

        assert_ne!(first.filename, second.filename);
        assert_ne!(first.path, second.path);
        // Neither write clobbered the other
        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(tokio::fs::read(&second.path).await.unwrap(), vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_no_leftover_temp_file() {
        let store = scratch_store();
        let handle = store.save(&mp3_upload(vec![9; 64])).await.unwrap();

        let mut entries = tokio::fs::read_dir(store.root()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec![handle.filename]);
    }

    #[tokio::test]
    async fn test_purge_on_missing_directory_is_noop() {
        let store = scratch_store();
        let removed = store.purge_older_than(Duration::from_secs(60)).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_purge_keeps_fresh_files() {
        let store = scratch_store();
        store.save(&mp3_upload(vec![1])).await.unwrap();
        let removed = store.purge_older_than(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_purge_removes_stale_files() {
        let store = scratch_store();
        store.save(&mp3_upload(vec![1])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Zero max age makes every already-written file stale
        let removed = store.purge_older_than(Duration::from_secs(0)).await.unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("audio/mpeg"), "mp3");
        assert_eq!(extension_for("audio/wav"), "wav");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
