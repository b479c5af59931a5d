// SPDX-License-Identifier: GPL-3.0-only

//! Sequence-numbered frame stream channels
//!
//! One single-writer/single-reader channel per consumer id. `publish` copies
//! a frame into the consumer's region and flips the readiness flag last;
//! `read` pulls the latest complete frame at most once per sequence number.
//! Wakes go through the hub's [`NotificationBridge`] so the consumer pulls
//! on its own scheduler, never on the producer thread.
//!
//! Publish calls for one id must be serialized by the caller; two concurrent
//! producers on the same id are a caller error and are not arbitrated.

pub(crate) mod region;
pub mod wire;

use crate::bridge::{ConsumerId, FrameReady, NotificationBridge};
use crate::constants::{MAX_FRAME_DIMENSION, MAX_REGION_BYTES};
use crate::errors::{StreamError, StreamResult};
use crate::frame::{Frame, PixelFormat};
use region::ChannelRegion;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace};
use wire::ChannelHeader;

/// Per-consumer channel state
///
/// The region is swapped wholesale on a shape change; the sequence counter
/// lives here so it stays monotonic across reallocations. An entry detached
/// by `close` keeps its storage alive until the last in-flight producer
/// reference drops, which is what makes teardown safe against a racing
/// publish.
struct ChannelEntry {
    region: Mutex<Arc<ChannelRegion>>,
    /// Producer-side frame counter; survives region reallocation
    next_sequence: AtomicU64,
    /// Reader-side duplicate/out-of-order suppression
    last_seen: AtomicU64,
    closed: AtomicBool,
}

/// Hub of per-consumer frame stream channels
pub struct FrameStreamHub {
    entries: Mutex<HashMap<ConsumerId, Arc<ChannelEntry>>>,
    bridge: NotificationBridge,
}

impl FrameStreamHub {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            bridge: NotificationBridge::new(),
        }
    }

    fn entry(&self, id: ConsumerId) -> Option<Arc<ChannelEntry>> {
        self.entries.lock().unwrap().get(&id).cloned()
    }

    /// Open (or reset) the channel for `id`
    ///
    /// Allocates a region shaped `header + stride × height` with the flag
    /// and sequence at zero. A failed open leaves no channel behind and the
    /// caller falls back to its own transport. Reopening an id installs a
    /// fresh entry; a publish still in flight against the old one lands in
    /// detached storage.
    pub fn open(
        &self,
        id: ConsumerId,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> StreamResult<()> {
        let stride = format.min_stride(width);
        validate_shape(width, height, stride, format)?;

        let entry = Arc::new(ChannelEntry {
            region: Mutex::new(Arc::new(ChannelRegion::new(width, height, stride, format))),
            next_sequence: AtomicU64::new(0),
            last_seen: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        if let Some(old) = self.entries.lock().unwrap().insert(id, entry) {
            old.closed.store(true, Ordering::Release);
        }
        info!(consumer = %id, width, height, %format, "Opened frame stream channel");
        Ok(())
    }

    /// Whether a channel is currently open for `id`
    pub fn is_open(&self, id: ConsumerId) -> bool {
        self.entry(id).is_some()
    }

    /// Producer side: copy one frame into the channel for `id`
    ///
    /// Single writer per id, serialized by the caller. A shape or format
    /// change swaps in a fresh region before the copy; in-flight readers see
    /// a brief "no frame" gap and re-validate dimensions on their next read.
    /// Publishing to an unknown or closed id is a silent no-op.
    pub fn publish(
        &self,
        id: ConsumerId,
        pixels: &[u8],
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> StreamResult<()> {
        let Some(entry) = self.entry(id) else {
            trace!(consumer = %id, "Publish to unopened channel ignored");
            return Ok(());
        };
        if entry.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let stride = if stride == 0 {
            format.min_stride(width)
        } else {
            stride
        };
        let len = validate_shape(width, height, stride, format)?;
        if pixels.len() < len {
            return Err(StreamError::PayloadTooSmall {
                expected: len,
                actual: pixels.len(),
            });
        }

        let region = {
            let mut guard = entry.region.lock().unwrap();
            if !guard.matches_shape(width, height, stride, format) {
                debug!(consumer = %id, width, height, stride, "Reallocating channel region");
                *guard = Arc::new(ChannelRegion::new(width, height, stride, format));
            }
            Arc::clone(&guard)
        };

        let sequence = entry.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        region.store_frame(&pixels[..len], sequence);
        Ok(())
    }

    /// Fire the registered wake target for `id` once
    ///
    /// Runs on whatever thread the producer calls it from; the target
    /// re-dispatches into the consumer's own scheduling context.
    pub fn notify(&self, id: ConsumerId) {
        self.bridge.notify(id);
    }

    /// Register the consumer's wake target for `id`
    pub fn subscribe(&self, id: ConsumerId) -> FrameReady {
        self.bridge.register(id)
    }

    /// Consumer side: pull the latest frame if it is new
    ///
    /// Returns `None` while no frame is ready, when the channel is not open,
    /// or when the latest sequence was already returned — all of which mean
    /// "no new frame", never an error. Safe to call redundantly.
    pub fn read(&self, id: ConsumerId) -> Option<Frame> {
        let entry = self.entry(id)?;
        let region = Arc::clone(&entry.region.lock().unwrap());
        let frame = region.load_frame()?;

        // Single reader per id; plain load/store is race-free here.
        let last = entry.last_seen.load(Ordering::Relaxed);
        if frame.sequence <= last {
            return None;
        }
        entry.last_seen.store(frame.sequence, Ordering::Relaxed);
        Some(frame)
    }

    /// Close the channel for `id`; idempotent
    ///
    /// Deregisters the wake target and detaches the region. The storage is
    /// freed once the last in-flight producer reference drops, so a racing
    /// publish completes harmlessly against the detached region.
    pub fn close(&self, id: ConsumerId) {
        self.bridge.unregister(id);
        if let Some(entry) = self.entries.lock().unwrap().remove(&id) {
            entry.closed.store(true, Ordering::Release);
            info!(consumer = %id, "Closed frame stream channel");
        }
    }

    /// Wire-form header snapshot for the channel region, if open
    pub fn header(&self, id: ConsumerId) -> Option<ChannelHeader> {
        let entry = self.entry(id)?;
        let region = Arc::clone(&entry.region.lock().unwrap());
        Some(region.header())
    }
}

impl Default for FrameStreamHub {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_shape(
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
) -> StreamResult<usize> {
    if width == 0 || height == 0 || width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION {
        return Err(StreamError::InvalidDimensions { width, height });
    }
    if stride < format.min_stride(width) {
        return Err(StreamError::StrideTooSmall { stride, width });
    }
    let len = stride as usize * height as usize;
    if len > MAX_REGION_BYTES {
        return Err(StreamError::RegionTooLarge { bytes: len });
    }
    Ok(len)
}
