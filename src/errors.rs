// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the frame delivery pipeline
//!
//! Only construction and validation failures surface as errors. Conditions
//! the protocol absorbs by design — a not-ready read, a stale sequence, a
//! publish after close, a double unregister — are `Option`/no-op returns
//! and never appear here.

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for preview surface operations
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Result type alias for stream channel operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Top-level pipeline error
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Preview surface errors
    Surface(SurfaceError),
    /// Stream channel errors
    Stream(StreamError),
    /// Session configuration errors
    Config(String),
}

/// Preview surface errors
#[derive(Debug, Clone)]
pub enum SurfaceError {
    /// Zero or out-of-range frame dimensions
    InvalidDimensions { width: u32, height: u32 },
    /// Row stride smaller than the tight stride for the frame width
    StrideTooSmall { stride: u32, width: u32 },
    /// Pixel slice shorter than the frame shape requires
    PayloadTooSmall { expected: usize, actual: usize },
}

/// Stream channel errors
#[derive(Debug, Clone)]
pub enum StreamError {
    /// Zero or out-of-range frame dimensions
    InvalidDimensions { width: u32, height: u32 },
    /// Row stride smaller than the tight stride for the frame width
    StrideTooSmall { stride: u32, width: u32 },
    /// Pixel slice shorter than the channel shape requires
    PayloadTooSmall { expected: usize, actual: usize },
    /// Channel region would exceed the payload size cap
    RegionTooLarge { bytes: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Surface(e) => write!(f, "Surface error: {}", e),
            PipelineError::Stream(e) => write!(f, "Stream error: {}", e),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions: {}x{}", width, height)
            }
            SurfaceError::StrideTooSmall { stride, width } => {
                write!(f, "Stride {} too small for width {}", stride, width)
            }
            SurfaceError::PayloadTooSmall { expected, actual } => {
                write!(f, "Payload too small: need {} bytes, got {}", expected, actual)
            }
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions: {}x{}", width, height)
            }
            StreamError::StrideTooSmall { stride, width } => {
                write!(f, "Stride {} too small for width {}", stride, width)
            }
            StreamError::PayloadTooSmall { expected, actual } => {
                write!(f, "Payload too small: need {} bytes, got {}", expected, actual)
            }
            StreamError::RegionTooLarge { bytes } => {
                write!(f, "Channel region of {} bytes exceeds the size cap", bytes)
            }
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for SurfaceError {}
impl std::error::Error for StreamError {}

// Conversions from sub-errors to PipelineError
impl From<SurfaceError> for PipelineError {
    fn from(err: SurfaceError) -> Self {
        PipelineError::Surface(err)
    }
}

impl From<StreamError> for PipelineError {
    fn from(err: StreamError) -> Self {
        PipelineError::Stream(err)
    }
}

impl From<String> for PipelineError {
    fn from(msg: String) -> Self {
        PipelineError::Config(msg)
    }
}
