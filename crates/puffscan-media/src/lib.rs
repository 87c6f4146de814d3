//! Video probing and frame compositing for PuffScan.
//!
//! Wraps FFmpeg/FFprobe for metadata and single-frame extraction, and
//! tiles sampled frames from a time window into one composite image for
//! vision model queries.

pub mod compositor;
pub mod error;
pub mod probe;
pub mod source;

pub use compositor::{compose, encode_jpeg, GridSpec, TimeWindow};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use source::{FfmpegFrameSource, FrameSource};
