//! Depth frame types
//!
//! A source lends a [`DepthFrameRef`] to its notification handler; the buffer is
//! only valid for the duration of that call. Consumers that need the data later
//! copy it into an owned [`DepthFrame`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Borrowed depth frame handed to a frame-ready notification
#[derive(Debug, Clone, Copy)]
pub struct DepthFrameRef<'a> {
    /// Source frame sequence number
    pub frame_id: u64,

    /// Capture timestamp (seconds since the source started)
    pub timestamp: f64,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Row-major depth samples in millimetres (0 = no reading)
    pub pixels: &'a [u16],
}

impl DepthFrameRef<'_> {
    /// Number of depth samples the frame is expected to carry
    pub fn frame_data_length(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Owned depth frame (copy-out of a [`DepthFrameRef`])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthFrame {
    pub frame_id: u64,
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,

    /// Native-endian u16 samples
    pub data: Bytes,
}

impl DepthFrame {
    /// Copy a borrowed frame into owned storage
    pub fn copy_from(frame: &DepthFrameRef<'_>) -> Self {
        Self {
            frame_id: frame.frame_id,
            timestamp: frame.timestamp,
            width: frame.width,
            height: frame.height,
            data: Bytes::copy_from_slice(bytemuck::cast_slice(frame.pixels)),
        }
    }

    /// Number of depth samples
    pub fn len(&self) -> usize {
        self.data.len() / std::mem::size_of::<u16>()
    }

    /// Whether the frame carries no samples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate depth samples in millimetres
    pub fn pixels(&self) -> impl Iterator<Item = u16> + '_ {
        self.data
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
    }
}

/// Depth frame converted to metres by the engine
#[derive(Debug, Clone, Default)]
pub struct FloatFrame {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,

    /// Row-major depth in metres (0.0 = outside clip range)
    pub depth: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_from_preserves_samples() {
        let pixels = [500u16, 0, 1200, 65535];
        let frame_ref = DepthFrameRef {
            frame_id: 7,
            timestamp: 0.25,
            width: 2,
            height: 2,
            pixels: &pixels,
        };

        let owned = DepthFrame::copy_from(&frame_ref);

        assert_eq!(owned.frame_id, 7);
        assert_eq!(owned.len(), 4);
        assert_eq!(owned.pixels().collect::<Vec<_>>(), pixels.to_vec());
    }

    #[test]
    fn test_frame_data_length() {
        let pixels = vec![0u16; 12];
        let frame_ref = DepthFrameRef {
            frame_id: 0,
            timestamp: 0.0,
            width: 4,
            height: 3,
            pixels: &pixels,
        };
        assert_eq!(frame_ref.frame_data_length(), 12);
    }
}
