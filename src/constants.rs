// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants

/// Largest accepted frame dimension on either axis
pub const MAX_FRAME_DIMENSION: u32 = 8192;

/// Largest accepted channel payload size in bytes (stride × height)
pub const MAX_REGION_BYTES: usize = 1 << 30;

/// Preview dimensions assumed before the first frame reports the actual size
pub const DEFAULT_FRAME_WIDTH: u32 = 1280;

/// See [`DEFAULT_FRAME_WIDTH`]
pub const DEFAULT_FRAME_HEIGHT: u32 = 720;

/// Log frame delivery stats every N frames (hot path, keep sparse)
pub const FRAME_LOG_INTERVAL: u64 = 120;
