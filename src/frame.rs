// SPDX-License-Identifier: GPL-3.0-only

//! Frame value types shared by the preview surface and the stream channels

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pixel format of a delivered frame
///
/// Both formats are 32-bit with alpha. The tag values are part of the
/// cross-boundary header layout (see [`crate::stream::wire`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// B G R A byte order (header tag 0)
    #[default]
    Bgra8888,
    /// R G B A byte order (header tag 1)
    Rgba8888,
}

impl PixelFormat {
    /// Bytes per pixel; both formats are 32-bit
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Header tag value for this format (0=BGRA, 1=RGBA)
    pub fn tag(&self) -> u32 {
        match self {
            PixelFormat::Bgra8888 => 0,
            PixelFormat::Rgba8888 => 1,
        }
    }

    /// Parse a header tag value back into a format
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(PixelFormat::Bgra8888),
            1 => Some(PixelFormat::Rgba8888),
            _ => None,
        }
    }

    /// Tight row stride in bytes for the given width
    pub fn min_stride(&self, width: u32) -> u32 {
        width * Self::BYTES_PER_PIXEL
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Bgra8888 => write!(f, "BGRA8888"),
            PixelFormat::Rgba8888 => write!(f, "RGBA8888"),
        }
    }
}

/// A single frame pulled from a stream channel
///
/// Immutable once published. The payload is reference-counted, so cloning a
/// frame never copies pixel data.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes; may include padding beyond `width * 4`
    pub stride: u32,
    pub format: PixelFormat,
    /// Monotonic sequence number assigned by the publisher, starting at 1
    pub sequence: u64,
    /// Pixel rows, `stride * height` bytes
    pub data: Arc<[u8]>,
}

impl Frame {
    /// Payload length implied by the frame shape
    pub fn expected_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}
