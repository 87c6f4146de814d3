//! Reference time scanning.
//!
//! The scanner walks a video forward in fixed steps, composes each window
//! into one tiled image, asks the model the dual-task prompt, and halts at
//! the first window whose overall answer is YES. Sub-question answers are
//! accumulated for every visited window whether or not it halts the scan,
//! so the observation series covers the whole searched range.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use puffscan_media::{compose, encode_jpeg, FrameSource, GridSpec, TimeWindow};
use puffscan_models::observation::round1;
use puffscan_models::{Answer, Observation};
use puffscan_vlm::{parse_response, ParsedResponse, PromptPair, QueryRequest, VisionQuery};

use crate::error::{WorkerError, WorkerResult};

const JPEG_QUALITY: u8 = 90;

/// Geometry and cadence of one scan.
#[derive(Debug, Clone)]
pub struct ScanParams {
    /// Window length in seconds
    pub segment_secs: f64,
    /// Window advance per step in seconds
    pub step_secs: f64,
    /// Seconds between sampled frames inside a window
    pub sample_secs: f64,
    /// Per-frame cell size on the composite canvas
    pub cell_size: (u32, u32),
}

impl ScanParams {
    /// The canonical cadence: step equals the segment, ten samples per
    /// window, 640x360 cells.
    pub fn for_segment(segment_secs: f64) -> Self {
        Self {
            segment_secs,
            step_secs: segment_secs,
            sample_secs: segment_secs / 10.0,
            cell_size: (640, 360),
        }
    }

    pub fn columns(&self) -> u32 {
        (self.segment_secs / self.sample_secs).round() as u32
    }

    pub fn grid(&self) -> GridSpec {
        GridSpec::single_row(self.columns(), self.cell_size.0, self.cell_size.1)
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// A window answered the overall question YES.
    Found,
    /// The window advance ran off the end of the video.
    Exhausted,
}

/// Result of one completed scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub status: ScanStatus,
    /// Start of the halting window, or of the last visited window when
    /// exhausted. Rounded to 0.1s.
    pub final_time: f64,
    /// Per-question observations from every visited window.
    pub accumulated: BTreeMap<u32, Vec<Observation>>,
    pub windows_visited: usize,
}

/// Forward scan over one video with one model.
pub struct ReferenceTimeScanner<'a> {
    source: &'a dyn FrameSource,
    client: &'a dyn VisionQuery,
    query_timeout: Duration,
}

impl<'a> ReferenceTimeScanner<'a> {
    pub fn new(
        source: &'a dyn FrameSource,
        client: &'a dyn VisionQuery,
        query_timeout: Duration,
    ) -> Self {
        Self {
            source,
            client,
            query_timeout,
        }
    }

    /// Scan forward from `start_time` until a positive window or exhaustion.
    ///
    /// Extraction and provider failures for a single window are logged and
    /// the window skipped; only fatal errors (bad credential, unknown
    /// model) abort the scan.
    pub async fn scan(
        &self,
        prompt: &PromptPair,
        start_time: f64,
        play_time: f64,
        params: &ScanParams,
    ) -> WorkerResult<ScanOutcome> {
        let mut current = start_time;
        let mut accumulated: BTreeMap<u32, Vec<Observation>> = BTreeMap::new();
        let mut windows_visited = 0usize;

        while current <= play_time - params.segment_secs {
            windows_visited += 1;
            let stamp = round1(current);

            match self.query_window(prompt, current, params).await {
                Ok(parsed) => {
                    for (question, verdict) in &parsed.questions {
                        let answer = if verdict.yes { Answer::Yes } else { Answer::No };
                        accumulated
                            .entry(*question)
                            .or_default()
                            .push(Observation::new(stamp, answer, verdict.confidence));
                    }

                    if parsed.overall.is_positive() {
                        info!(
                            window_start = stamp,
                            windows_visited = windows_visited,
                            "Reference point found"
                        );
                        return Ok(ScanOutcome {
                            status: ScanStatus::Found,
                            final_time: stamp,
                            accumulated,
                            windows_visited,
                        });
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(window_start = stamp, error = %e, "Window skipped");
                }
            }

            current += params.step_secs;
        }

        let final_time = round1(current - params.step_secs);
        info!(
            final_time = final_time,
            windows_visited = windows_visited,
            "Scan exhausted without a positive window"
        );
        Ok(ScanOutcome {
            status: ScanStatus::Exhausted,
            final_time,
            accumulated,
            windows_visited,
        })
    }

    async fn query_window(
        &self,
        prompt: &PromptPair,
        start: f64,
        params: &ScanParams,
    ) -> WorkerResult<ParsedResponse> {
        let window = TimeWindow::new(start, start + params.segment_secs)?;
        let image = compose(self.source, window, params.grid()).await?;
        let jpeg = encode_jpeg(&image, JPEG_QUALITY)?;

        let request = QueryRequest {
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            image_jpeg: Some(jpeg),
        };

        let text = tokio::time::timeout(self.query_timeout, self.client.query(&request))
            .await
            .map_err(|_| {
                WorkerError::analysis_failed(format!(
                    "query timed out after {:?}",
                    self.query_timeout
                ))
            })??;

        Ok(parse_response(&text))
    }
}
