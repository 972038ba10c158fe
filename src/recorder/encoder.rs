//! Video encoders
//!
//! The recorder writes frames through the `Encoder` trait so the state
//! machine does not care what sits behind it. The production encoder is an
//! FFmpeg child process fed raw RGB frames over stdin, producing a
//! faststart MP4.

use super::RecordingError;
use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

/// Sink for raw RGB frames of a fixed size.
pub trait Encoder: Send {
    /// Append one complete RGB frame. Frames arrive in order.
    fn append(&mut self, rgb: &[u8]) -> Result<(), RecordingError>;

    /// Flush and close the container.
    fn finish(self: Box<Self>) -> Result<(), RecordingError>;
}

/// H.264/MP4 encoder backed by an ffmpeg child process.
pub struct FfmpegEncoder {
    process: Child,
    stdin: ChildStdin,
    frames_written: u64,
}

impl FfmpegEncoder {
    /// Whether an ffmpeg binary is reachable on PATH.
    pub fn is_available() -> bool {
        Command::new("ffmpeg").arg("-version").output().is_ok()
    }

    /// Spawn the encoder writing to `output`.
    pub fn open(output: &Path, width: u32, height: u32, fps: u32) -> Result<Self, RecordingError> {
        let output_file = output.to_string_lossy().to_string();

        let mut process = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgb24",
                "-video_size",
                &format!("{width}x{height}"),
                "-framerate",
                &fps.to_string(),
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-pix_fmt",
                "yuv420p",
                "-crf",
                "18",
                "-g",
                &(fps * 2).to_string(),
                "-movflags",
                "+faststart",
                &output_file,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RecordingError::Encoder(format!("failed to start ffmpeg: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| RecordingError::Encoder("failed to capture ffmpeg stdin".to_string()))?;

        tracing::info!(
            "started ffmpeg encoder: {}x{} @ {}fps, output: {}",
            width,
            height,
            fps,
            output_file
        );

        Ok(Self {
            process,
            stdin,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Encoder for FfmpegEncoder {
    fn append(&mut self, rgb: &[u8]) -> Result<(), RecordingError> {
        self.stdin
            .write_all(rgb)
            .map_err(|e| RecordingError::Encoder(format!("failed to write frame: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), RecordingError> {
        let FfmpegEncoder {
            process,
            stdin,
            frames_written: frames,
        } = *self;

        // Closing stdin signals EOF to ffmpeg.
        drop(stdin);

        let output = process
            .wait_with_output()
            .map_err(|e| RecordingError::Encoder(format!("failed to wait for ffmpeg: {e}")))?;

        if !output.status.success() {
            // A zero-frame stream makes ffmpeg exit nonzero; the container
            // on disk is still the best artifact we have, so report and
            // carry on rather than discard it.
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("ffmpeg exited with status {}: {}", output.status, stderr);
        }

        tracing::info!("ffmpeg encoder finished: {} frames written", frames);
        Ok(())
    }
}
