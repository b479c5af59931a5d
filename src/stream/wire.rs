// SPDX-License-Identifier: GPL-3.0-only

//! Cross-boundary channel header layout
//!
//! Both sides of the runtime boundary agree on a bit-exact 32-byte header in
//! native byte order, followed immediately by `stride × height` payload
//! bytes. [`ChannelHeader`] is the plain snapshot form; the live region
//! keeps the same fields at the same offsets as atomics (see
//! `stream::region`).

use bytemuck::{Pod, Zeroable};

/// Header format tag for BGRA8888
pub const FORMAT_TAG_BGRA: u32 = 0;

/// Header format tag for RGBA8888
pub const FORMAT_TAG_RGBA: u32 = 1;

/// Header size in bytes; payload rows start immediately after
pub const HEADER_SIZE: usize = 32;

/// Byte offset of the sequence field
pub const SEQUENCE_OFFSET: usize = 0;
/// Byte offset of the width field
pub const WIDTH_OFFSET: usize = 8;
/// Byte offset of the height field
pub const HEIGHT_OFFSET: usize = 12;
/// Byte offset of the stride field
pub const STRIDE_OFFSET: usize = 16;
/// Byte offset of the format tag field
pub const FORMAT_OFFSET: usize = 20;
/// Byte offset of the readiness flag
pub const READY_OFFSET: usize = 24;

/// Bit-exact channel header snapshot
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ChannelHeader {
    /// Monotonic frame counter; 0 means no frame has been published
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per payload row
    pub stride: u32,
    /// 0=BGRA8888, 1=RGBA8888
    pub format: u32,
    /// 1 while the payload is safe to read, 0 while the writer owns it
    pub ready: u32,
    pub reserved: u32,
}

impl ChannelHeader {
    /// Payload length implied by the header fields
    pub fn payload_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }
}

const _: () = assert!(std::mem::size_of::<ChannelHeader>() == HEADER_SIZE);
const _: () = assert!(std::mem::offset_of!(ChannelHeader, sequence) == SEQUENCE_OFFSET);
const _: () = assert!(std::mem::offset_of!(ChannelHeader, width) == WIDTH_OFFSET);
const _: () = assert!(std::mem::offset_of!(ChannelHeader, height) == HEIGHT_OFFSET);
const _: () = assert!(std::mem::offset_of!(ChannelHeader, stride) == STRIDE_OFFSET);
const _: () = assert!(std::mem::offset_of!(ChannelHeader, format) == FORMAT_OFFSET);
const _: () = assert!(std::mem::offset_of!(ChannelHeader, ready) == READY_OFFSET);
