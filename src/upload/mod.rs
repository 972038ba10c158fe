//! Upload pipeline
//!
//! Orchestrates recorder output or user-supplied files into the object
//! store. The one invariant everything here bends around: a local
//! temporary's lifetime ends with the upload attempt, not with its
//! outcome. The file is removed exactly once whether the store call
//! succeeded or failed.

use crate::store::{ObjectStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// What happened to the local temporary after an upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Local file was removed
    Removed,
    /// Local file could not be removed and may linger
    FailedToRemove(String),
    /// No local file was involved, or it was already gone
    NotNeeded,
}

/// Upload failures, carrying the cleanup outcome alongside the cause
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("local file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to stage buffer: {0}")]
    Staging(#[source] io::Error),

    #[error("store rejected {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
        cleanup: CleanupOutcome,
    },
}

impl UploadError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_retryable())
    }
}

/// One completed transfer, as observed after the fact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    /// Remote object key
    pub key: String,

    /// Object size in bytes
    pub size_bytes: u64,

    /// When the transfer completed (or the object's last-modified time,
    /// for records produced by listing)
    pub uploaded_at: DateTime<Utc>,

    /// Time-bounded shareable read URL, when one was requested
    pub url: Option<String>,
}

/// Build the remote key for a local file: `{prefix}/{timestamp}_{basename}`.
///
/// Timestamps are second-granular; two uploads of the same filename within
/// the same second collide. Known gap, kept deliberately: operators rely
/// on the key shape for lexicographic browsing.
pub fn remote_key(prefix: &str, local: &Path, at: DateTime<Utc>) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    let name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("upload"));
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{stamp}_{name}")
    } else {
        format!("{prefix}/{stamp}_{name}")
    }
}

fn remove_local(path: &Path) -> CleanupOutcome {
    match fs::remove_file(path) {
        Ok(()) => CleanupOutcome::Removed,
        Err(e) if e.kind() == io::ErrorKind::NotFound => CleanupOutcome::NotNeeded,
        Err(e) => CleanupOutcome::FailedToRemove(e.to_string()),
    }
}

/// Moves finished recordings and staged files into the object store.
///
/// One upload at a time per instance; an upload runs to completion or
/// failure with no mid-operation cancellation.
pub struct UploadPipeline {
    store: Arc<dyn ObjectStore>,
    presign_ttl: Duration,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn ObjectStore>, presign_ttl: Duration) -> Self {
        Self { store, presign_ttl }
    }

    /// Upload a local file under `{prefix}/{timestamp}_{basename}` and
    /// delete it afterwards, on success and on failure alike. A failed store
    /// call reports the `StoreError` with the cleanup outcome attached.
    pub async fn upload_file(
        &self,
        local: &Path,
        prefix: &str,
    ) -> Result<UploadRecord, UploadError> {
        if !local.exists() {
            return Err(UploadError::MissingSource(local.to_path_buf()));
        }
        let size_bytes = fs::metadata(local).map(|m| m.len()).unwrap_or(0);
        let key = remote_key(prefix, local, Utc::now());

        let put = self.store.put_file(local, &key).await;
        let cleanup = remove_local(local);

        match put {
            Ok(()) => {
                if let CleanupOutcome::FailedToRemove(reason) = &cleanup {
                    tracing::warn!("uploaded {key} but local cleanup failed: {reason}");
                }
                tracing::info!("uploaded {key} ({size_bytes} bytes)");
                Ok(UploadRecord {
                    key,
                    size_bytes,
                    uploaded_at: Utc::now(),
                    url: None,
                })
            }
            Err(source) => Err(UploadError::Store {
                key,
                source,
                cleanup,
            }),
        }
    }

    /// Upload an in-memory buffer directly under `key`. No local file,
    /// no cleanup.
    pub async fn upload_buffer(
        &self,
        data: Vec<u8>,
        key: &str,
    ) -> Result<UploadRecord, UploadError> {
        let size_bytes = data.len() as u64;
        self.store
            .put_bytes(data, key)
            .await
            .map_err(|source| UploadError::Store {
                key: key.to_string(),
                source,
                cleanup: CleanupOutcome::NotNeeded,
            })?;

        tracing::info!("uploaded {key} ({size_bytes} bytes) from buffer");
        Ok(UploadRecord {
            key: key.to_string(),
            size_bytes,
            uploaded_at: Utc::now(),
            url: None,
        })
    }

    /// Write a caller-supplied buffer into the staging directory, ready
    /// for `upload_file`. Mirrors the browser-upload flow: materialize,
    /// then upload-and-delete.
    pub fn stage_buffer(
        &self,
        staging_dir: &Path,
        filename: &str,
        data: &[u8],
    ) -> Result<PathBuf, UploadError> {
        fs::create_dir_all(staging_dir).map_err(UploadError::Staging)?;
        let path = staging_dir.join(filename);
        fs::write(&path, data).map_err(UploadError::Staging)?;
        Ok(path)
    }

    /// List at most `limit` records under `prefix`, each with a presigned
    /// read URL of the configured lifetime. Order is whatever the store
    /// enumerates; sort by `uploaded_at` if chronology matters.
    pub async fn list_recent(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<UploadRecord>, UploadError> {
        let objects =
            self.store
                .list(prefix, limit)
                .await
                .map_err(|source| UploadError::Store {
                    key: prefix.to_string(),
                    source,
                    cleanup: CleanupOutcome::NotNeeded,
                })?;

        let mut records = Vec::with_capacity(objects.len().min(limit));
        for obj in objects.into_iter().take(limit) {
            let url = match self.store.presign(&obj.key, self.presign_ttl).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("presign failed for {}: {e}", obj.key);
                    None
                }
            };
            records.push(UploadRecord {
                key: obj.key,
                size_bytes: obj.size,
                uploaded_at: obj.last_modified,
                url,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_remote_key_shape() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let key = remote_key("oak_videos", Path::new("temp_recordings/clip.mp4"), at);
        assert_eq!(key, "oak_videos/20250314_092653_clip.mp4");
    }

    #[test]
    fn test_remote_key_trailing_slash_prefix() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let key = remote_key("videos/", Path::new("clip.mp4"), at);
        assert_eq!(key, "videos/20250314_092653_clip.mp4");
    }

    #[test]
    fn test_remote_key_empty_prefix() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let key = remote_key("", Path::new("clip.mp4"), at);
        assert_eq!(key, "20250314_092653_clip.mp4");
    }

    #[test]
    fn test_remote_keys_differ_across_seconds() {
        let first = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let second = first + chrono::Duration::seconds(1);
        let a = remote_key("videos", Path::new("clip.mp4"), first);
        let b = remote_key("videos", Path::new("clip.mp4"), second);
        assert_ne!(a, b);
        assert!(a.starts_with("videos/") && a.ends_with("_clip.mp4"));
        assert!(b.starts_with("videos/") && b.ends_with("_clip.mp4"));
    }

    #[test]
    fn test_remove_local_missing_file_is_not_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-existed");
        assert_eq!(remove_local(&path), CleanupOutcome::NotNeeded);
    }
}
