//! Frame access behind a narrow trait.
//!
//! The scanner only needs metadata and random access to single frames, so
//! that is the whole interface. The production implementation shells out to
//! FFmpeg per frame; tests substitute an in-memory source.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use image::RgbImage;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// Read-only access to a decoded video.
///
/// Implementations must be safe for concurrent reads; parallel analyzer
/// runs each open their own source over the same file.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Video metadata captured at open time.
    fn info(&self) -> &VideoInfo;

    /// Decode the frame at the given index.
    async fn frame_at(&self, frame_index: u64) -> MediaResult<RgbImage>;
}

/// FFmpeg-backed frame source: each read seeks and decodes one frame.
pub struct FfmpegFrameSource {
    path: PathBuf,
    info: VideoInfo,
}

impl FfmpegFrameSource {
    /// Open a video file, probing its metadata.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
        let info = probe_video(path).await?;

        if info.fps <= 0.0 {
            return Err(MediaError::InvalidVideo(format!(
                "Non-positive frame rate for {}",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn frame_at(&self, frame_index: u64) -> MediaResult<RgbImage> {
        let seconds = frame_index as f64 / self.info.fps;

        debug!(
            frame_index = frame_index,
            seconds = seconds,
            "Extracting frame via ffmpeg"
        );

        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-ss"])
            .arg(format!("{:.3}", seconds))
            .arg("-i")
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::FfmpegFailed {
                message: format!("Frame extraction failed at index {}", frame_index),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            });
        }

        if output.stdout.is_empty() {
            // Seek past end of stream produces no frame but exit code 0.
            return Err(MediaError::frame_read(
                frame_index,
                "No frame data returned (seek past end of stream?)",
            ));
        }

        let decoded = image::load_from_memory(&output.stdout)
            .map_err(|e| MediaError::frame_read(frame_index, e.to_string()))?;
        Ok(decoded.to_rgb8())
    }
}
