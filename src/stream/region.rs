// SPDX-License-Identifier: GPL-3.0-only

//! Live channel region: header atomics plus a payload byte region
//!
//! In-process rendering of the shared-memory handshake. The header fields
//! mirror the wire layout (`stream::wire`) as atomics, and the payload is a
//! fixed byte region written by exactly one producer and read by exactly one
//! consumer. The readiness flag is the release/acquire handshake: it goes
//! to 0 before the writer touches the payload and back to 1 only after the
//! full frame is written. The reader additionally re-validates the flag and
//! sequence after copying, so a copy that raced an overwrite is discarded
//! instead of returned torn.
//!
//! A region's shape is fixed at construction; a dimension or format change
//! swaps in a whole new region at the hub level. The payload is therefore
//! never reallocated while a producer or reader holds the region.

use crate::frame::{Frame, PixelFormat};
use crate::stream::wire::ChannelHeader;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering, fence};

pub(crate) struct ChannelRegion {
    sequence: AtomicU64,
    width: AtomicU32,
    height: AtomicU32,
    stride: AtomicU32,
    format: AtomicU32,
    ready: AtomicU32,
    payload: UnsafeCell<Box<[u8]>>,
}

// The payload race is deliberate: the single producer may overwrite bytes
// while the single reader copies them out. A copy is only trusted after the
// ready/sequence re-validation below, so a torn copy never escapes.
unsafe impl Sync for ChannelRegion {}

impl ChannelRegion {
    pub(crate) fn new(width: u32, height: u32, stride: u32, format: PixelFormat) -> Self {
        let len = stride as usize * height as usize;
        Self {
            sequence: AtomicU64::new(0),
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
            stride: AtomicU32::new(stride),
            format: AtomicU32::new(format.tag()),
            ready: AtomicU32::new(0),
            payload: UnsafeCell::new(vec![0u8; len].into_boxed_slice()),
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        // Never mutated after construction.
        unsafe { (&(*self.payload.get())).len() }
    }

    pub(crate) fn matches_shape(
        &self,
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> bool {
        self.width.load(Ordering::Relaxed) == width
            && self.height.load(Ordering::Relaxed) == height
            && self.stride.load(Ordering::Relaxed) == stride
            && self.format.load(Ordering::Relaxed) == format.tag()
    }

    /// Producer side: store one frame and flip the readiness flag last
    ///
    /// Caller guarantees a single writer per region and
    /// `pixels.len() >= payload_len()`.
    pub(crate) fn store_frame(&self, pixels: &[u8], sequence: u64) {
        let len = self.payload_len();

        // Writer owns the payload while ready is 0.
        self.ready.store(0, Ordering::SeqCst);
        unsafe {
            let dst = (*self.payload.get()).as_mut_ptr();
            std::ptr::copy_nonoverlapping(pixels.as_ptr(), dst, len);
        }
        self.sequence.store(sequence, Ordering::Release);
        // Release: every payload and header write above is visible before a
        // reader can observe ready == 1.
        self.ready.store(1, Ordering::Release);
    }

    /// Consumer side: one copy out, re-validated against a racing overwrite
    ///
    /// Returns `None` while no frame is ready; never an error.
    pub(crate) fn load_frame(&self) -> Option<Frame> {
        if self.ready.load(Ordering::Acquire) != 1 {
            return None;
        }
        let sequence = self.sequence.load(Ordering::Acquire);
        if sequence == 0 {
            return None;
        }
        let width = self.width.load(Ordering::Relaxed);
        let height = self.height.load(Ordering::Relaxed);
        let stride = self.stride.load(Ordering::Relaxed);
        let format = PixelFormat::from_tag(self.format.load(Ordering::Relaxed))?;
        let len = stride as usize * height as usize;
        if len > self.payload_len() {
            return None;
        }

        let mut data = vec![0u8; len];
        unsafe {
            let src = (*self.payload.get()).as_ptr();
            std::ptr::copy_nonoverlapping(src, data.as_mut_ptr(), len);
        }

        // Re-validate after the copy; a writer that started in between has
        // cleared the flag or advanced the sequence.
        fence(Ordering::Acquire);
        if self.ready.load(Ordering::Relaxed) != 1
            || self.sequence.load(Ordering::Relaxed) != sequence
        {
            return None;
        }

        Some(Frame {
            width,
            height,
            stride,
            format,
            sequence,
            data: Arc::from(data),
        })
    }

    /// Snapshot of the header fields in wire form
    pub(crate) fn header(&self) -> ChannelHeader {
        ChannelHeader {
            sequence: self.sequence.load(Ordering::Acquire),
            width: self.width.load(Ordering::Relaxed),
            height: self.height.load(Ordering::Relaxed),
            stride: self.stride.load(Ordering::Relaxed),
            format: self.format.load(Ordering::Relaxed),
            ready: self.ready.load(Ordering::Relaxed),
            reserved: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_region_has_no_frame() {
        let region = ChannelRegion::new(4, 4, 16, PixelFormat::Bgra8888);
        assert!(region.load_frame().is_none());
        assert_eq!(region.header().sequence, 0);
        assert_eq!(region.header().ready, 0);
    }

    #[test]
    fn test_store_then_load() {
        let region = ChannelRegion::new(4, 4, 16, PixelFormat::Rgba8888);
        region.store_frame(&vec![0x5Au8; 64], 1);

        let frame = region.load_frame().expect("stored frame");
        assert_eq!(frame.sequence, 1);
        assert_eq!((frame.width, frame.height, frame.stride), (4, 4, 16));
        assert_eq!(frame.format, PixelFormat::Rgba8888);
        assert!(frame.data.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let region = ChannelRegion::new(2, 2, 8, PixelFormat::Bgra8888);
        region.store_frame(&vec![1u8; 16], 1);
        region.store_frame(&vec![2u8; 16], 2);

        let frame = region.load_frame().expect("latest frame");
        assert_eq!(frame.sequence, 2);
        assert!(frame.data.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_matches_shape() {
        let region = ChannelRegion::new(4, 4, 16, PixelFormat::Bgra8888);
        assert!(region.matches_shape(4, 4, 16, PixelFormat::Bgra8888));
        assert!(!region.matches_shape(4, 4, 16, PixelFormat::Rgba8888));
        assert!(!region.matches_shape(8, 4, 32, PixelFormat::Bgra8888));
    }
}
