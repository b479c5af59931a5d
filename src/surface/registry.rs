// SPDX-License-Identifier: GPL-3.0-only

//! Display registration for preview surfaces
//!
//! Couples a surface to the host display/texture system. The host pulls
//! content on demand through the opaque handle, and producer-side
//! frame-available marks are routed through a [`NotificationBridge`] so the
//! renderer schedules the pull on its own cadence instead of running on the
//! capture thread.

use crate::bridge::{ConsumerId, FrameReady, NotificationBridge};
use crate::surface::PreviewSurface;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Opaque id the host uses to pull surface content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<SurfaceHandle> for ConsumerId {
    fn from(handle: SurfaceHandle) -> Self {
        ConsumerId::new(handle.0 as i64)
    }
}

impl std::fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry mapping opaque handles to live preview surfaces
pub struct DisplayRegistry {
    surfaces: Mutex<HashMap<SurfaceHandle, Arc<PreviewSurface>>>,
    bridge: NotificationBridge,
    next_handle: AtomicU64,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self {
            surfaces: Mutex::new(HashMap::new()),
            bridge: NotificationBridge::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Register a surface; the returned handle is never reused
    pub fn register(&self, surface: Arc<PreviewSurface>) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.surfaces.lock().unwrap().insert(handle, surface);
        info!(handle = %handle, "Registered preview surface");
        handle
    }

    /// Look up the surface for `handle`; the host calls `acquire` on it
    pub fn get(&self, handle: SurfaceHandle) -> Option<Arc<PreviewSurface>> {
        self.surfaces.lock().unwrap().get(&handle).cloned()
    }

    /// Subscribe the host renderer to frame-available wakes for `handle`
    pub fn frame_ready(&self, handle: SurfaceHandle) -> FrameReady {
        self.bridge.register(handle.into())
    }

    /// Producer side: a new frame was committed to the surface
    ///
    /// Coalescing-safe; unregistered handles are a no-op.
    pub fn mark_frame_available(&self, handle: SurfaceHandle) {
        if self.surfaces.lock().unwrap().contains_key(&handle) {
            self.bridge.notify(handle.into());
        }
    }

    /// Release the registration and stop wake delivery; idempotent
    ///
    /// The surface storage is freed once the last reference drops, so a
    /// producer mid-`write` finishes safely against detached storage.
    pub fn unregister(&self, handle: SurfaceHandle) {
        self.bridge.unregister(handle.into());
        if self.surfaces.lock().unwrap().remove(&handle).is_some() {
            info!(handle = %handle, "Unregistered preview surface");
        }
    }
}

impl Default for DisplayRegistry {
    fn default() -> Self {
        Self::new()
    }
}
