// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, MAX_FRAME_DIMENSION};
use crate::errors::{PipelineError, PipelineResult};
use crate::frame::PixelFormat;
use serde::{Deserialize, Serialize};

/// Capture session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pixel format delivered by the capture collaborator
    pub format: PixelFormat,
    /// Expected frame width before the first frame reports the actual size
    pub width: u32,
    /// Expected frame height before the first frame reports the actual size
    pub height: u32,
    /// Start with the preview surface paused (the first frame still goes
    /// through so initialization can complete)
    pub start_paused: bool,
    /// Start with pixel streaming enabled
    pub start_streaming: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            format: PixelFormat::default(),
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            start_paused: false,
            start_streaming: false,
        }
    }
}

impl SessionConfig {
    /// Check the configured dimensions are usable
    pub fn validate(&self) -> PipelineResult<()> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_FRAME_DIMENSION
            || self.height > MAX_FRAME_DIMENSION
        {
            return Err(PipelineError::Config(format!(
                "invalid session dimensions {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
