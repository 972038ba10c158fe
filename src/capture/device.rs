//! Camera device session
//!
//! Owns the hardware link and its output queue. Frames are pulled on a
//! dedicated capture thread and handed to the caller through a single-slot
//! overwrite-latest cell, so `poll_frame` never blocks: a slow consumer
//! simply sees only the most recent frame.

use super::frame::Frame;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use thiserror::Error;

/// Errors from the hardware link
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("no camera device found")]
    NotFound,

    #[error("failed to open camera: {0}")]
    OpenFailed(String),

    #[error("camera stream fault: {0}")]
    StreamFault(String),
}

/// Fixed capture configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device ID or index to open (None = first camera)
    pub device_id: Option<String>,

    /// Requested capture width
    pub width: u32,

    /// Requested capture height
    pub height: u32,

    /// Requested frame rate
    pub fps: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Information about an attached camera
#[derive(Debug, Clone)]
pub struct CameraDeviceInfo {
    /// Backend device ID or index
    pub id: String,

    /// Human-readable device name
    pub name: String,
}

/// Enumerate attached cameras.
pub fn list_devices() -> Vec<CameraDeviceInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };
                CameraDeviceInfo {
                    id,
                    name: info.human_name().to_string(),
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {e}");
            Vec::new()
        }
    }
}

/// Live hardware link state
struct Link {
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Frame>>>,
    thread: thread::JoinHandle<()>,
}

/// Exclusive owner of one camera device.
///
/// Exactly one session per device per process; opening a second session
/// against the same device is expected to fail at the backend.
pub struct DeviceSession {
    config: DeviceConfig,
    link: Option<Link>,
}

impl DeviceSession {
    pub fn new(config: DeviceConfig) -> Self {
        Self { config, link: None }
    }

    /// Establish the hardware link.
    ///
    /// The camera is opened on the capture thread (backends are not `Send`
    /// on every platform) and the result is reported back synchronously, so
    /// a missing or claimed device fails here, not on the first poll.
    /// Calling `open` on an already-open session is a no-op.
    pub fn open(&mut self) -> Result<(), DeviceError> {
        if self.link.is_some() {
            return Ok(());
        }

        if list_devices().is_empty() {
            return Err(DeviceError::NotFound);
        }

        let running = Arc::new(AtomicBool::new(true));
        let latest: Arc<Mutex<Option<Frame>>> = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();

        let config = self.config.clone();
        let thread_running = running.clone();
        let thread_latest = latest.clone();

        let thread = thread::spawn(move || {
            capture_loop(config, thread_running, thread_latest, ready_tx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.link = Some(Link {
                    running,
                    latest,
                    thread,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::OpenFailed(
                    "capture thread exited before reporting".to_string(),
                ))
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Drain the most recent frame if one is available.
    ///
    /// Never blocks and never errors on transient absence of data; `None`
    /// simply means nothing new arrived since the last poll.
    pub fn poll_frame(&mut self) -> Option<Frame> {
        self.link.as_ref()?.latest.lock().take()
    }

    /// Release the hardware link.
    ///
    /// Safe to call repeatedly, and safe even if `open` never succeeded.
    pub fn close(&mut self) {
        if let Some(link) = self.link.take() {
            link.running.store(false, Ordering::SeqCst);
            let _ = link.thread.join();
            tracing::info!("camera link closed");
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn camera_index(device_id: &Option<String>) -> CameraIndex {
    match device_id {
        Some(id) => match id.parse::<u32>() {
            Ok(idx) => CameraIndex::Index(idx),
            Err(_) => CameraIndex::String(id.clone()),
        },
        None => CameraIndex::Index(0),
    }
}

fn capture_loop(
    config: DeviceConfig,
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Frame>>>,
    ready: mpsc::Sender<Result<(), DeviceError>>,
) {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
        CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::YUYV,
            config.fps,
        ),
    ));

    let mut camera = match Camera::new(camera_index(&config.device_id), requested) {
        Ok(c) => c,
        Err(e) => {
            let _ = ready.send(Err(DeviceError::OpenFailed(e.to_string())));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(DeviceError::StreamFault(e.to_string())));
        return;
    }

    let _ = ready.send(Ok(()));

    let format = camera.camera_format();
    tracing::info!(
        "camera link open: {}x{} @ {}fps ({:?}), requested {}x{} @ {}fps",
        format.resolution().width(),
        format.resolution().height(),
        format.frame_rate(),
        format.format(),
        config.width,
        config.height,
        config.fps
    );

    while running.load(Ordering::SeqCst) {
        // camera.frame() blocks until the device delivers; the device
        // controls the pacing, the consumer just drains the latest slot.
        match camera.frame() {
            Ok(raw) => match raw.decode_image::<RgbFormat>() {
                Ok(image) => {
                    let (width, height) = (image.width(), image.height());
                    let frame = Frame::new(width, height, image.into_raw());
                    *latest.lock() = Some(frame);
                }
                Err(e) => tracing::debug!("frame decode failed: {e}"),
            },
            Err(e) => tracing::debug!("frame capture failed: {e}"),
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!("error stopping camera stream: {e}");
    }
    tracing::info!("camera capture thread stopped");
}
