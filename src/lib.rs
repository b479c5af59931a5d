// SPDX-License-Identifier: GPL-3.0-only

//! framepipe - zero-copy camera frame delivery
//!
//! Delivers live camera frames from a native, asynchronously-running capture
//! source to a display surface and a pixel-data stream without blocking the
//! producer. Producer and consumer run on independent, uncoordinated
//! schedules; the only copies are the one into a slot or region and the one
//! into the consumer-owned value.
//!
//! # Architecture
//!
//! - [`surface`]: triple-buffered preview surface plus the display registry
//! - [`stream`]: sequence-numbered single-writer/single-reader channels with
//!   the cross-boundary header layout
//! - [`bridge`]: producer-to-consumer wake delivery, coalescing-safe
//! - [`session`]: per-capture-session fan-out and lifecycle
//! - [`config`], [`errors`], [`constants`]: ambient support
//!
//! # Example
//!
//! ```
//! use framepipe::{CaptureSession, ConsumerId, DisplayRegistry, FrameStreamHub, SessionConfig};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(DisplayRegistry::new());
//! let hub = Arc::new(FrameStreamHub::new());
//! let session = CaptureSession::new(SessionConfig::default(), registry.clone(), hub.clone())
//!     .expect("valid config");
//!
//! // Capture callback thread:
//! let pixels = vec![0u8; 4 * 4 * 4];
//! session.push_frame(&pixels, 4, 4, 0).expect("frame accepted");
//!
//! // Renderer pulls on its own cadence:
//! let surface = registry.get(session.surface_handle()).expect("registered");
//! let view = surface.acquire(4, 4).expect("content");
//! assert_eq!((view.width(), view.height()), (4, 4));
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod session;
pub mod stream;
pub mod surface;

pub use bridge::{ConsumerId, FrameReady, NotificationBridge};
pub use config::SessionConfig;
pub use errors::{PipelineError, PipelineResult};
pub use frame::{Frame, PixelFormat};
pub use session::CaptureSession;
pub use stream::FrameStreamHub;
pub use surface::registry::{DisplayRegistry, SurfaceHandle};
pub use surface::{FrameView, PreviewSurface};
