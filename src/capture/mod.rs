//! Camera capture
//!
//! Device session lifecycle and the frame type it produces.

pub mod device;
pub mod frame;

pub use device::{list_devices, CameraDeviceInfo, DeviceConfig, DeviceError, DeviceSession};
pub use frame::Frame;
