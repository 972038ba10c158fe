//! Recording state and session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// One active capture-to-file operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Session ID
    pub id: Uuid,

    /// When recording started
    pub started_at: DateTime<Utc>,

    /// Destination file path
    pub path: PathBuf,

    /// Frames appended so far
    pub frames_appended: u64,
}

impl RecordingSession {
    pub fn new(path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            path,
            frames_appended: 0,
        }
    }
}

/// A finished recording, ready for upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedFile {
    /// Path to the finished container file
    pub path: PathBuf,

    /// File size in bytes
    pub size_bytes: u64,

    /// Number of frames that made it into the container
    pub frame_count: u64,
}
