//! Headless capture demo.
//!
//! Opens the camera, records for a fixed duration (first CLI argument,
//! seconds, default 5), uploads the clip and lists the five most recent
//! uploads with presigned preview URLs.

use anyhow::{Context, Result};
use spokhand_capture::capture::list_devices;
use spokhand_capture::recorder::FfmpegEncoder;
use spokhand_capture::{
    DeviceConfig, DeviceSession, Recorder, RecorderSettings, S3ObjectStore, StoreConfig,
    UploadPipeline,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spokhand_capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting spokhand-capture v{}", env!("CARGO_PKG_VERSION"));

    let record_secs: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(5);

    if !FfmpegEncoder::is_available() {
        anyhow::bail!("ffmpeg not found on PATH; install it to record");
    }

    let config = StoreConfig::from_env();
    let store = Arc::new(S3ObjectStore::connect(&config).await);
    let pipeline = UploadPipeline::new(store, config.presign_ttl);

    for camera in list_devices() {
        tracing::info!("camera available: [{}] {}", camera.id, camera.name);
    }

    let mut device = DeviceSession::new(DeviceConfig::default());
    device.open().context("failed to open camera")?;

    let mut recorder = Recorder::new(RecorderSettings::default());
    let session = recorder
        .start(&config.recording_dir)
        .context("failed to start recording")?;
    tracing::info!("recording {} for {record_secs}s", session.path.display());

    let deadline = Instant::now() + Duration::from_secs(record_secs);
    while Instant::now() < deadline {
        if let Some(frame) = device.poll_frame() {
            // The preview surface would render the frame here.
            recorder.append_frame(&frame)?;
        }
        // Cap the polling loop's CPU use; any small interval works.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let completed = recorder.stop()?;
    device.close();

    if let Some(file) = completed {
        let record = pipeline
            .upload_file(&file.path, &config.video_prefix)
            .await
            .context("upload failed")?;
        tracing::info!(
            "uploaded s3://{}/{} ({} bytes)",
            config.bucket,
            record.key,
            record.size_bytes
        );
    } else {
        tracing::warn!("no recording produced, nothing to upload");
    }

    // A listing failure degrades to an empty view, not an abort.
    match pipeline
        .list_recent(&format!("{}/", config.video_prefix), 5)
        .await
    {
        Ok(records) => {
            for record in records {
                tracing::info!(
                    "recent upload: {} ({} bytes) {}",
                    record.key,
                    record.size_bytes,
                    record.url.unwrap_or_default()
                );
            }
        }
        Err(e) => tracing::warn!("listing recent uploads failed: {e}"),
    }

    Ok(())
}
