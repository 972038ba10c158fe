//! Spokhand capture: depth-camera recording and S3 upload pipeline.
//!
//! The pipeline is four pieces wired in sequence: a `DeviceSession` pulls
//! frames from the camera, a `Recorder` buffers them into a local video
//! file, and an `UploadPipeline` moves the finished file into an
//! `ObjectStore` under a timestamped key, cleaning up the local temporary
//! whether or not the store call succeeded. Any front end (web, native
//! GUI, CLI loop) drives it by polling frames on its own tick.

pub mod capture;
pub mod config;
pub mod processing;
pub mod recorder;
pub mod store;
pub mod upload;

pub use capture::{DeviceConfig, DeviceError, DeviceSession, Frame};
pub use config::StoreConfig;
pub use processing::{process_notifications, ObjectNotification, ProcessingOutcome};
pub use recorder::{
    CompletedFile, Recorder, RecorderSettings, RecordingError, RecordingSession, RecordingState,
};
pub use store::{MemoryObjectStore, ObjectInfo, ObjectStore, S3ObjectStore, StoreError};
pub use upload::{CleanupOutcome, UploadError, UploadPipeline, UploadRecord};
