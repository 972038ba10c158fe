//! Recording
//!
//! The `Recorder` buffers a sequence of frames into a local video file for
//! the duration of one recording. State machine: `Idle -> Recording -> Idle`.
//! Delivery is best-effort and frames may be dropped under backpressure,
//! but a partial frame is never written into the container.

pub mod encoder;
pub mod state;

pub use encoder::{Encoder, FfmpegEncoder};
pub use state::{CompletedFile, RecordingSession, RecordingState};

use crate::capture::Frame;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Recording failures
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,
}

/// Encoder settings for new recordings
#[derive(Debug, Clone, Copy)]
pub struct RecorderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

struct ActiveRecording {
    session: RecordingSession,
    encoder: Box<dyn Encoder>,
    frame_len: usize,
}

/// Buffers frames into a local video file while recording is active.
///
/// The encoder and destination file are owned exclusively by the active
/// session for its lifetime; every exit path, including failures, closes
/// the encoder before returning.
pub struct Recorder {
    settings: RecorderSettings,
    state: RecordingState,
    active: Option<ActiveRecording>,
}

impl Recorder {
    pub fn new(settings: RecorderSettings) -> Self {
        Self {
            settings,
            state: RecordingState::Idle,
            active: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn settings(&self) -> RecorderSettings {
        self.settings
    }

    /// Start a new recording under `target_dir`.
    ///
    /// Creates the directory on demand and names the file with the current
    /// timestamp. If the directory cannot be created or the encoder cannot
    /// be opened, the recorder stays `Idle`.
    pub fn start(&mut self, target_dir: &Path) -> Result<RecordingSession, RecordingError> {
        if self.state == RecordingState::Recording {
            return Err(RecordingError::AlreadyRecording);
        }

        fs::create_dir_all(target_dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = target_dir.join(format!("recording_{stamp}.mp4"));

        let encoder = FfmpegEncoder::open(
            &path,
            self.settings.width,
            self.settings.height,
            self.settings.fps,
        )?;

        self.begin(path, Box::new(encoder))
    }

    /// Start a recording with a caller-supplied encoder.
    ///
    /// Used by front ends that bring their own container writer, and by
    /// tests that exercise the state machine without an ffmpeg binary.
    pub fn start_with_encoder(
        &mut self,
        path: PathBuf,
        encoder: Box<dyn Encoder>,
    ) -> Result<RecordingSession, RecordingError> {
        if self.state == RecordingState::Recording {
            return Err(RecordingError::AlreadyRecording);
        }
        self.begin(path, encoder)
    }

    fn begin(
        &mut self,
        path: PathBuf,
        encoder: Box<dyn Encoder>,
    ) -> Result<RecordingSession, RecordingError> {
        let session = RecordingSession::new(path);
        let frame_len = Frame::rgb_len(self.settings.width, self.settings.height);

        tracing::info!("recording started: {}", session.path.display());

        self.active = Some(ActiveRecording {
            session: session.clone(),
            encoder,
            frame_len,
        });
        self.state = RecordingState::Recording;
        Ok(session)
    }

    /// Append one frame in arrival order.
    ///
    /// While `Idle` this is a no-op; frames outside a recording window are
    /// droppable by contract. Wrong-sized frames are dropped before they
    /// reach the container. A write failure closes the encoder and returns
    /// the machine to `Idle` before the error propagates.
    pub fn append_frame(&mut self, frame: &Frame) -> Result<(), RecordingError> {
        let result = match self.active.as_mut() {
            None => return Ok(()),
            Some(active) => {
                if frame.data.len() != active.frame_len {
                    tracing::debug!(
                        "dropping frame with {} bytes (container expects {})",
                        frame.data.len(),
                        active.frame_len
                    );
                    return Ok(());
                }
                active.encoder.append(&frame.data)
            }
        };

        match result {
            Ok(()) => {
                if let Some(active) = self.active.as_mut() {
                    active.session.frames_appended += 1;
                }
                Ok(())
            }
            Err(e) => {
                self.state = RecordingState::Idle;
                if let Some(active) = self.active.take() {
                    if let Err(close_err) = active.encoder.finish() {
                        tracing::warn!("encoder close after write failure failed: {close_err}");
                    }
                }
                Err(e)
            }
        }
    }

    /// Stop the active recording, flushing and closing the encoder.
    ///
    /// Returns the finished file and its size. Stopping while `Idle`
    /// returns `Ok(None)`, not an error. A recording with zero frames
    /// still finalizes to a file.
    pub fn stop(&mut self) -> Result<Option<CompletedFile>, RecordingError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        self.state = RecordingState::Idle;

        let frame_count = active.session.frames_appended;
        let path = active.session.path.clone();

        active.encoder.finish()?;

        let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "recording stopped: {} ({} frames, {} bytes)",
            path.display(),
            frame_count,
            size_bytes
        );

        Ok(Some(CompletedFile {
            path,
            size_bytes,
            frame_count,
        }))
    }
}
