//! Captured frame type
//!
//! A `Frame` is one color image pulled from the device, with an optional
//! aligned depth plane when the device pipeline produces one.

use chrono::{DateTime, Utc};

/// One captured image at a point in time.
///
/// Frames are transient: they carry no identity beyond their capture
/// timestamp and are dropped once consumed by the preview or recorder.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Packed RGB pixels, row-major, `width * height * 3` bytes
    pub data: Vec<u8>,

    /// Aligned depth plane (millimeters), `width * height` samples,
    /// present only when the device exposes a depth stream
    pub depth: Option<Vec<u16>>,

    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Create a color-only frame captured now.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            depth: None,
            captured_at: Utc::now(),
        }
    }

    /// Attach an aligned depth plane.
    pub fn with_depth(mut self, depth: Vec<u16>) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Expected byte length of a complete RGB buffer at the given size.
    pub fn rgb_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Whether the color buffer holds a full image. Partial frames must
    /// never reach an encoder.
    pub fn is_complete(&self) -> bool {
        self.data.len() == Self::rgb_len(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_frame() {
        let frame = Frame::new(4, 2, vec![0u8; 24]);
        assert!(frame.is_complete());
        assert!(frame.depth.is_none());
    }

    #[test]
    fn test_partial_frame() {
        let frame = Frame::new(4, 2, vec![0u8; 10]);
        assert!(!frame.is_complete());
    }

    #[test]
    fn test_depth_plane() {
        let frame = Frame::new(2, 2, vec![0u8; 12]).with_depth(vec![100u16; 4]);
        assert_eq!(frame.depth.as_ref().map(Vec::len), Some(4));
    }
}
