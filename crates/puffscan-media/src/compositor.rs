//! Frame compositing: tile sampled frames from a time window into one image.
//!
//! One composite covers one scan window, so a single model call sees the
//! whole window at reduced per-frame resolution.

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::source::FrameSource;

/// A half-open time range in seconds bounding one model query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> MediaResult<Self> {
        if !(end > start) || start < 0.0 {
            return Err(MediaError::InvalidWindow(format!(
                "start {:.3} .. end {:.3}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Grid and canvas geometry for a composite.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    /// (rows, cols)
    pub grid: (u32, u32),
    /// Canvas size in pixels (width, height)
    pub canvas: (u32, u32),
    /// Padding between cells in pixels (x, y)
    pub pad: (u32, u32),
}

impl GridSpec {
    /// One row of `cols` cells, each cell at the given size.
    pub fn single_row(cols: u32, cell_width: u32, cell_height: u32) -> Self {
        Self {
            grid: (1, cols),
            canvas: (cell_width * cols, cell_height),
            pad: (0, 0),
        }
    }

    fn cell_size(&self) -> MediaResult<(u32, u32)> {
        let (rows, cols) = self.grid;
        if rows == 0 || cols == 0 {
            return Err(MediaError::InvalidGrid(format!("{}x{} grid", rows, cols)));
        }
        let pad_w = (cols - 1) * self.pad.0;
        let pad_h = (rows - 1) * self.pad.1;
        if pad_w >= self.canvas.0 || pad_h >= self.canvas.1 {
            return Err(MediaError::InvalidGrid(
                "padding exceeds canvas".to_string(),
            ));
        }
        let cell_w = (self.canvas.0 - pad_w) / cols;
        let cell_h = (self.canvas.1 - pad_h) / rows;
        if cell_w == 0 || cell_h == 0 {
            return Err(MediaError::InvalidGrid(format!(
                "cell size {}x{}",
                cell_w, cell_h
            )));
        }
        Ok((cell_w, cell_h))
    }
}

/// Sample `rows × cols` frames from the window and tile them row-major.
///
/// Frames are spaced `max(window_frames / n, 1)` source frames apart. Any
/// unreadable frame fails the whole composite; the caller treats that as
/// "insufficient data" for the window, never as a partial image.
pub async fn compose(
    source: &dyn FrameSource,
    window: TimeWindow,
    spec: GridSpec,
) -> MediaResult<RgbImage> {
    let (rows, cols) = spec.grid;
    let n = (rows * cols) as u64;
    let (cell_w, cell_h) = spec.cell_size()?;

    let fps = source.info().fps;
    let start_frame = (window.start * fps) as u64;
    let end_frame = (window.end * fps) as u64;
    let spacing = ((end_frame - start_frame) / n).max(1);

    debug!(
        start = window.start,
        end = window.end,
        frames = n,
        spacing = spacing,
        "Compositing window"
    );

    let mut frames = Vec::with_capacity(n as usize);
    for i in 0..n {
        let index = start_frame + i * spacing;
        let frame = source.frame_at(index).await.map_err(|e| {
            debug!(frame_index = index, error = %e, "Frame read failed");
            match e {
                MediaError::FrameRead { .. } => MediaError::InsufficientFrames {
                    expected: n as usize,
                    actual: i as usize,
                },
                other => other,
            }
        })?;
        frames.push(frame);
    }

    let mut canvas = RgbImage::new(spec.canvas.0, spec.canvas.1);
    for (idx, frame) in frames.iter().enumerate() {
        let row = idx as u32 / cols;
        let col = idx as u32 % cols;
        let x = col * (cell_w + spec.pad.0);
        let y = row * (cell_h + spec.pad.1);

        let resized = imageops::resize(frame, cell_w, cell_h, FilterType::Triangle);
        imageops::replace(&mut canvas, &resized, x as i64, y as i64);
    }

    Ok(canvas)
}

/// Encode a composite to JPEG for the wire.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> MediaResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(image)?;
    Ok(buf)
}
