// SPDX-License-Identifier: GPL-3.0-only

//! Triple-buffered preview surface
//!
//! Three identically-capacitied pixel slots rotate through the WRITE, READY
//! and READ roles. The producer owns the WRITE slot and fills it without
//! touching shared state; committing a frame swaps WRITE and READY under a
//! mutex held only for the O(1) role exchange. The consumer owns the READ
//! slot and swaps it with READY the same way. Neither side ever waits for
//! the other beyond that bounded critical section, a slot is never read
//! while it is being written, and the READY slot absorbs any rate mismatch.

pub mod registry;

use crate::constants::MAX_FRAME_DIMENSION;
use crate::errors::{SurfaceError, SurfaceResult};
use crate::frame::PixelFormat;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing::debug;

/// One pixel storage slot plus its current shape
#[derive(Default)]
struct Slot {
    buf: Vec<u8>,
    width: u32,
    height: u32,
}

impl Slot {
    fn has_content(&self) -> bool {
        self.width != 0 && self.height != 0
    }
}

/// The spare READY slot plus the new-frame flag; the only state both the
/// producer and the consumer touch
#[derive(Default)]
struct Exchange {
    ready: Slot,
    new_frame: bool,
}

/// Triple-buffered surface decoupling the producer's write rate from the
/// renderer's pull rate
///
/// `write` and `acquire` run concurrently on independent threads at
/// independent rates; no frame is ever observed partially written, and the
/// displayed frame is never overwritten while a [`FrameView`] is live.
pub struct PreviewSurface {
    format: PixelFormat,
    /// WRITE slot, producer side
    write: Mutex<Slot>,
    /// READY slot and handshake flag
    exchange: Mutex<Exchange>,
    /// READ slot, consumer side; the guard held by a live [`FrameView`]
    /// enforces the single-reader contract
    read: Mutex<Slot>,
}

impl PreviewSurface {
    pub fn new(format: PixelFormat) -> Arc<Self> {
        Arc::new(Self {
            format,
            write: Mutex::new(Slot::default()),
            exchange: Mutex::new(Exchange::default()),
            read: Mutex::new(Slot::default()),
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Producer side: copy one frame in and commit it
    ///
    /// Callable from any thread at any rate; never blocks on the consumer.
    /// A `stride` of zero means tightly packed. Padded rows are tightened
    /// into the slot so downstream consumers always see tight rows. A
    /// dimension change reallocates the WRITE slot before the copy; the
    /// other slots adopt the new shape as they rotate through the writer.
    pub fn write(&self, pixels: &[u8], width: u32, height: u32, stride: u32) -> SurfaceResult<()> {
        if width == 0 || height == 0 || width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION
        {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        let tight = self.format.min_stride(width);
        let stride = if stride == 0 { tight } else { stride };
        if stride < tight {
            return Err(SurfaceError::StrideTooSmall { stride, width });
        }
        let needed = stride as usize * height as usize;
        if pixels.len() < needed {
            return Err(SurfaceError::PayloadTooSmall {
                expected: needed,
                actual: pixels.len(),
            });
        }

        let tight_len = tight as usize * height as usize;
        let mut write = self.write.lock().unwrap();
        if write.width != width || write.height != height {
            debug!(width, height, "Reallocating preview slot");
            write.buf.clear();
            write.buf.resize(tight_len, 0);
            write.width = width;
            write.height = height;
        }
        if stride == tight {
            write.buf[..tight_len].copy_from_slice(&pixels[..tight_len]);
        } else {
            let stride = stride as usize;
            let tight = tight as usize;
            for (row, dst) in write.buf[..tight_len].chunks_exact_mut(tight).enumerate() {
                dst.copy_from_slice(&pixels[row * stride..row * stride + tight]);
            }
        }

        // O(1) role swap: WRITE becomes READY, the old READY becomes the
        // next WRITE slot.
        let mut exchange = self.exchange.lock().unwrap();
        std::mem::swap(&mut *write, &mut exchange.ready);
        exchange.new_frame = true;
        Ok(())
    }

    /// Consumer side: pull the latest complete frame
    ///
    /// Invoked on the renderer's own cadence. If a new frame is flagged the
    /// READY and READ roles swap under the O(1) critical section; otherwise
    /// the current READ slot is returned again. Returns `None` before the
    /// first commit, and `None` instead of blocking if a previous
    /// [`FrameView`] is still alive. The requested dimensions are a host
    /// hint; the view reports the actual frame shape.
    pub fn acquire(
        &self,
        _requested_width: u32,
        _requested_height: u32,
    ) -> Option<FrameView<'_>> {
        let mut read = match self.read.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return None,
            Err(TryLockError::Poisoned(_)) => return None,
        };
        {
            let mut exchange = self.exchange.lock().unwrap();
            if exchange.new_frame {
                std::mem::swap(&mut *read, &mut exchange.ready);
                exchange.new_frame = false;
            }
        }
        if !read.has_content() {
            return None;
        }
        Some(FrameView {
            guard: read,
            format: self.format,
        })
    }
}

/// Read-only view of the surface's current READ slot
///
/// Valid for read-only use until dropped; the next `acquire` on the same
/// surface returns `None` while a view is alive.
pub struct FrameView<'a> {
    guard: MutexGuard<'a, Slot>,
    format: PixelFormat,
}

impl FrameView<'_> {
    /// Tightly packed pixel rows
    pub fn bytes(&self) -> &[u8] {
        &self.guard.buf
    }

    pub fn width(&self) -> u32 {
        self.guard.width
    }

    pub fn height(&self) -> u32 {
        self.guard.height
    }

    /// Row stride in bytes; rows are tight after `write`
    pub fn stride(&self) -> u32 {
        self.format.min_stride(self.guard.width)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn filled(len: usize, value: u8) -> Vec<u8> {
        vec![value; len]
    }

    #[test]
    fn test_acquire_before_first_write_returns_none() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        assert!(surface.acquire(640, 480).is_none());
    }

    #[test]
    fn test_write_then_acquire() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        let pixels = filled(4 * 4 * 4, 0xAB);
        surface.write(&pixels, 4, 4, 0).unwrap();

        let view = surface.acquire(4, 4).expect("frame after write");
        assert_eq!(view.width(), 4);
        assert_eq!(view.height(), 4);
        assert_eq!(view.stride(), 16);
        assert_eq!(view.bytes(), pixels.as_slice());
    }

    #[test]
    fn test_acquire_without_new_frame_returns_current_slot() {
        let surface = PreviewSurface::new(PixelFormat::Rgba8888);
        surface.write(&filled(64, 1), 4, 4, 0).unwrap();

        {
            let view = surface.acquire(4, 4).unwrap();
            assert_eq!(view.bytes()[0], 1);
        }
        // No new write; the READ slot is handed out again.
        let view = surface.acquire(4, 4).expect("current slot");
        assert_eq!(view.bytes()[0], 1);
    }

    #[test]
    fn test_acquire_while_view_live_returns_none() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        surface.write(&filled(64, 2), 4, 4, 0).unwrap();

        let view = surface.acquire(4, 4).unwrap();
        assert!(surface.acquire(4, 4).is_none());
        drop(view);
        assert!(surface.acquire(4, 4).is_some());
    }

    #[test]
    fn test_resize_yields_new_shape() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        surface.write(&filled(320 * 240 * 4, 1), 320, 240, 0).unwrap();
        surface.write(&filled(640 * 480 * 4, 2), 640, 480, 0).unwrap();

        let view = surface.acquire(640, 480).expect("resized frame");
        assert_eq!((view.width(), view.height()), (640, 480));
        assert_eq!(view.bytes().len(), 640 * 480 * 4);
        assert!(view.bytes().iter().all(|&b| b == 2));
    }

    #[test]
    fn test_padded_stride_is_tightened() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        // Width 4 (tight stride 16) delivered with stride 24.
        let mut pixels = vec![0u8; 24 * 2];
        for row in 0..2 {
            for b in 0..16 {
                pixels[row * 24 + b] = (row * 16 + b) as u8;
            }
        }
        surface.write(&pixels, 4, 2, 24).unwrap();

        let view = surface.acquire(4, 2).unwrap();
        assert_eq!(view.bytes().len(), 32);
        let expected: Vec<u8> = (0..32).map(|b| b as u8).collect();
        assert_eq!(view.bytes(), expected.as_slice());
    }

    #[test]
    fn test_write_validation() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        assert!(matches!(
            surface.write(&[], 0, 4, 0),
            Err(SurfaceError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            surface.write(&filled(8, 0), 4, 4, 8),
            Err(SurfaceError::StrideTooSmall { .. })
        ));
        assert!(matches!(
            surface.write(&filled(8, 0), 4, 4, 0),
            Err(SurfaceError::PayloadTooSmall { .. })
        ));
    }

    #[test]
    fn test_concurrent_write_acquire_never_tears() {
        let surface = PreviewSurface::new(PixelFormat::Bgra8888);
        let producer_surface = Arc::clone(&surface);
        let done = Arc::new(AtomicBool::new(false));
        let producer_done = Arc::clone(&done);

        // Each write fills the whole frame with one distinct byte; a torn
        // read would show a mix of fill values inside one view.
        let producer = thread::spawn(move || {
            for i in 0..500u32 {
                let fill = (i % 251) as u8;
                let pixels = vec![fill; 64 * 64 * 4];
                producer_surface.write(&pixels, 64, 64, 0).unwrap();
            }
            producer_done.store(true, Ordering::Release);
        });

        let mut observed = 0u32;
        while !done.load(Ordering::Acquire) || observed == 0 {
            if let Some(view) = surface.acquire(64, 64) {
                let first = view.bytes()[0];
                assert!(
                    view.bytes().iter().all(|&b| b == first),
                    "torn frame observed"
                );
                observed += 1;
            }
            thread::sleep(Duration::from_micros(50));
        }

        producer.join().unwrap();
        assert!(observed > 0);
    }
}
