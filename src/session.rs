// SPDX-License-Identifier: GPL-3.0-only

//! Per-capture-session frame fan-out and lifecycle
//!
//! One [`CaptureSession`] per running capture source. The capture
//! collaborator calls [`CaptureSession::push_frame`] from its callback
//! thread once per frame; the session records the actual dimensions, trips
//! the first-frame latch, updates the preview surface unless paused, and
//! publishes to the stream channel when streaming is enabled. Teardown gates
//! the producer first and then releases the consumer registrations, so a
//! callback racing `stop` either completes against detached storage or
//! observes the closed gate and no-ops.

use crate::bridge::ConsumerId;
use crate::config::SessionConfig;
use crate::constants::FRAME_LOG_INTERVAL;
use crate::errors::PipelineResult;
use crate::frame::PixelFormat;
use crate::stream::FrameStreamHub;
use crate::surface::PreviewSurface;
use crate::surface::registry::{DisplayRegistry, SurfaceHandle};
use futures::channel::oneshot;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A live capture session feeding a preview surface and, optionally, a
/// pixel stream channel
pub struct CaptureSession {
    config: SessionConfig,
    surface: Arc<PreviewSurface>,
    registry: Arc<DisplayRegistry>,
    handle: SurfaceHandle,
    hub: Arc<FrameStreamHub>,
    stream_consumer: Mutex<Option<ConsumerId>>,
    paused: AtomicBool,
    streaming: AtomicBool,
    stopped: AtomicBool,
    first_frame_seen: AtomicBool,
    actual_width: AtomicU32,
    actual_height: AtomicU32,
    frame_count: AtomicU64,
    first_frame_tx: Mutex<Option<oneshot::Sender<(u32, u32)>>>,
    first_frame_rx: Mutex<Option<oneshot::Receiver<(u32, u32)>>>,
}

impl CaptureSession {
    /// Create a session, registering its preview surface with the display
    pub fn new(
        config: SessionConfig,
        registry: Arc<DisplayRegistry>,
        hub: Arc<FrameStreamHub>,
    ) -> PipelineResult<Arc<Self>> {
        config.validate()?;
        let surface = PreviewSurface::new(config.format);
        let handle = registry.register(Arc::clone(&surface));
        let (tx, rx) = oneshot::channel();
        info!(handle = %handle, width = config.width, height = config.height, "Capture session created");

        Ok(Arc::new(Self {
            paused: AtomicBool::new(config.start_paused),
            streaming: AtomicBool::new(config.start_streaming),
            config,
            surface,
            registry,
            handle,
            hub,
            stream_consumer: Mutex::new(None),
            stopped: AtomicBool::new(false),
            first_frame_seen: AtomicBool::new(false),
            actual_width: AtomicU32::new(0),
            actual_height: AtomicU32::new(0),
            frame_count: AtomicU64::new(0),
            first_frame_tx: Mutex::new(Some(tx)),
            first_frame_rx: Mutex::new(Some(rx)),
        }))
    }

    /// Handle the host uses to pull preview content
    pub fn surface_handle(&self) -> SurfaceHandle {
        self.handle
    }

    /// The session's preview surface
    pub fn surface(&self) -> Arc<PreviewSurface> {
        Arc::clone(&self.surface)
    }

    /// Pixel format frames are delivered in
    pub fn format(&self) -> PixelFormat {
        self.config.format
    }

    /// Producer entry point, one call per captured frame
    ///
    /// Runs on the capture collaborator's thread; never blocks on a
    /// consumer. After `stop` this is a silent no-op.
    pub fn push_frame(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        stride: u32,
    ) -> PipelineResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Ok(());
        }

        self.actual_width.store(width, Ordering::Relaxed);
        self.actual_height.store(height, Ordering::Relaxed);

        let first = !self.first_frame_seen.swap(true, Ordering::AcqRel);
        if first {
            info!(width, height, "First frame received");
            if let Some(tx) = self.first_frame_tx.lock().unwrap().take() {
                // The embedder may have dropped the receiver already.
                let _ = tx.send((width, height));
            }
        }

        // The first frame always reaches the surface so initialization can
        // complete even when the preview starts paused.
        if first || !self.paused.load(Ordering::Relaxed) {
            self.surface.write(pixels, width, height, stride)?;
            self.registry.mark_frame_available(self.handle);
        }

        if self.streaming.load(Ordering::Relaxed) {
            let consumer = *self.stream_consumer.lock().unwrap();
            if let Some(id) = consumer {
                self.hub
                    .publish(id, pixels, width, height, stride, self.config.format)?;
                self.hub.notify(id);
            }
        }

        let count = self.frame_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % FRAME_LOG_INTERVAL == 0 {
            debug!(frame = count, width, height, "Frame delivery stats");
        }
        Ok(())
    }

    /// Stop feeding the preview surface; streaming is unaffected
    pub fn pause_preview(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume_preview(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Open the stream channel for `id` and start publishing to it
    ///
    /// The channel is shaped by the actual frame size once known, otherwise
    /// by the configured size; a later mismatch reallocates on publish.
    pub fn start_stream(&self, id: ConsumerId) -> PipelineResult<()> {
        let (width, height) = self
            .actual_size()
            .unwrap_or((self.config.width, self.config.height));
        self.hub.open(id, width, height, self.config.format)?;
        *self.stream_consumer.lock().unwrap() = Some(id);
        self.streaming.store(true, Ordering::Release);
        Ok(())
    }

    /// Stop publishing and close the stream channel; idempotent
    pub fn stop_stream(&self) {
        self.streaming.store(false, Ordering::Release);
        if let Some(id) = self.stream_consumer.lock().unwrap().take() {
            self.hub.close(id);
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }

    /// Actual frame dimensions, once the first frame has reported them
    pub fn actual_size(&self) -> Option<(u32, u32)> {
        let width = self.actual_width.load(Ordering::Relaxed);
        let height = self.actual_height.load(Ordering::Relaxed);
        if width == 0 || height == 0 {
            None
        } else {
            Some((width, height))
        }
    }

    /// One-shot receiver resolving to the first frame's dimensions
    ///
    /// Returns `Some` on the first call only.
    pub fn first_frame(&self) -> Option<oneshot::Receiver<(u32, u32)>> {
        self.first_frame_rx.lock().unwrap().take()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Tear the session down; idempotent
    ///
    /// Gates the producer first, then closes the stream channel and the
    /// display registration. Storage stays alive until the last in-flight
    /// producer call drops its reference.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop_stream();
        self.registry.unregister(self.handle);
        info!(handle = %self.handle, "Capture session stopped");
    }
}
