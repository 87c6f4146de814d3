//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while probing videos or compositing frames.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Failed to read frame {frame_index}: {message}")]
    FrameRead { frame_index: u64, message: String },

    #[error("Window yielded {actual} readable frames, expected {expected}")]
    InsufficientFrames { expected: usize, actual: usize },

    #[error("Invalid grid geometry: {0}")]
    InvalidGrid(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a frame read error.
    pub fn frame_read(frame_index: u64, message: impl Into<String>) -> Self {
        Self::FrameRead {
            frame_index,
            message: message.into(),
        }
    }
}
