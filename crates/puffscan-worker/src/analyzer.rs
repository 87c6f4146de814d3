//! One model's complete pass over a video.
//!
//! A run owns a fresh observation store and scans the three stages in
//! order, each starting where the previous halted. The result is an
//! immutable record; nothing is shared with concurrent runs.

use std::collections::BTreeMap;
use std::time::Duration;

use puffscan_media::FrameSource;
use puffscan_models::{ActionCatalog, ObservationStore, ReferenceCatalog};
use puffscan_vlm::VisionQuery;

use crate::error::WorkerResult;
use crate::logging::ScanLogger;
use crate::scanner::{ReferenceTimeScanner, ScanStatus};
use crate::stages::canonical_stages;

/// Outcome of one model's run: the filled store plus per-stage summaries.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub model: String,
    pub store: ObservationStore,
    pub reference_times: BTreeMap<String, f64>,
    pub statuses: BTreeMap<String, ScanStatus>,
}

/// One analyzer run over one video with one model variant.
pub struct AnalyzerRun<'a> {
    model: String,
    source: &'a dyn FrameSource,
    client: &'a dyn VisionQuery,
    references: &'a ReferenceCatalog,
    actions: &'a ActionCatalog,
    query_timeout: Duration,
}

impl<'a> AnalyzerRun<'a> {
    pub fn new(
        model: &str,
        source: &'a dyn FrameSource,
        client: &'a dyn VisionQuery,
        references: &'a ReferenceCatalog,
        actions: &'a ActionCatalog,
        query_timeout: Duration,
    ) -> Self {
        Self {
            model: model.to_string(),
            source,
            client,
            references,
            actions,
            query_timeout,
        }
    }

    /// Run all stages sequentially and commit each into the store.
    ///
    /// An exhausted stage still hands its last visited window to the next
    /// stage as a starting point; the degraded status is kept in the
    /// result so the report can flag it.
    pub async fn execute(&self) -> WorkerResult<RunResult> {
        let play_time = self.source.info().duration;
        let mut store = ObservationStore::new(self.references, self.actions);
        let scanner = ReferenceTimeScanner::new(self.source, self.client, self.query_timeout);

        let mut start = 0.0f64;
        let mut reference_times = BTreeMap::new();
        let mut statuses = BTreeMap::new();

        for stage in canonical_stages() {
            let logger = ScanLogger::new(&self.model, stage.reference_key);
            logger.log_start(&format!("scanning from {:.1}s", start));

            let prompt = stage.prompt(self.references, self.actions)?;
            let outcome = scanner
                .scan(&prompt, start, play_time, &stage.params())
                .await?;

            store.commit(
                stage.reference_key,
                outcome.final_time,
                &outcome.accumulated,
                &stage.question_map(),
            );

            match outcome.status {
                ScanStatus::Found => logger.log_completion(&format!(
                    "found at {:.1}s after {} windows",
                    outcome.final_time, outcome.windows_visited
                )),
                ScanStatus::Exhausted => logger.log_warning(&format!(
                    "exhausted at {:.1}s after {} windows",
                    outcome.final_time, outcome.windows_visited
                )),
            }

            reference_times.insert(stage.reference_key.to_string(), outcome.final_time);
            statuses.insert(stage.reference_key.to_string(), outcome.status);
            start = outcome.final_time.max(0.0);
        }

        Ok(RunResult {
            model: self.model.clone(),
            store,
            reference_times,
            statuses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use puffscan_media::{MediaError, MediaResult, VideoInfo};
    use puffscan_vlm::{QueryRequest, VlmResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        info: VideoInfo,
    }

    impl StubSource {
        fn new(duration: f64) -> Self {
            let fps = 10.0;
            Self {
                info: VideoInfo {
                    duration,
                    frame_count: (duration * fps) as u64,
                    width: 64,
                    height: 36,
                    fps,
                    size: 0,
                },
            }
        }
    }

    #[async_trait]
    impl FrameSource for StubSource {
        fn info(&self) -> &VideoInfo {
            &self.info
        }

        async fn frame_at(&self, frame_index: u64) -> MediaResult<RgbImage> {
            if frame_index >= self.info.frame_count {
                return Err(MediaError::frame_read(frame_index, "past end of stream"));
            }
            Ok(RgbImage::from_pixel(64, 36, Rgb([20, 20, 20])))
        }
    }

    struct ScriptedModel {
        responses: Vec<String>,
        cursor: AtomicUsize,
    }

    #[async_trait]
    impl VisionQuery for ScriptedModel {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn query(&self, _request: &QueryRequest) -> VlmResult<String> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .responses
                .get(i)
                .unwrap_or_else(|| panic!("unscripted query #{}", i + 1))
                .clone())
        }
    }

    fn response(overall: &str, answers: &[(u32, &str, f64)]) -> String {
        let mut text = format!("Overall_Answer: {}\n", overall);
        for (q, answer, confidence) in answers {
            text.push_str(&format!("Q{}_Answer: {}\n", q, answer));
            text.push_str(&format!("Q{}_Confidence: {}\n", q, confidence));
        }
        text
    }

    fn eight_yes() -> Vec<(u32, &'static str, f64)> {
        (1..=8).map(|q| (q, "YES", 0.8)).collect()
    }

    fn six_answers(answer: &'static str) -> Vec<(u32, &'static str, f64)> {
        (1..=6).map(|q| (q, answer, 0.6)).collect()
    }

    #[tokio::test]
    async fn test_full_run_chains_stages() {
        // 12-second video. Stage 1 (segment 3, from 0): NO at 0, YES at 3.
        // Stage 2 (segment 2, from 3): YES at 3. Stage 3 (segment 3,
        // from 3): NO at 3, YES at 6.
        let source = StubSource::new(12.0);
        let model = ScriptedModel {
            responses: vec![
                response("NO", &[(1, "NO", 0.5)]),
                response("YES", &[(1, "YES", 0.9)]),
                response("YES", &eight_yes()),
                response("NO", &six_answers("NO")),
                response("YES", &six_answers("YES")),
            ],
            cursor: AtomicUsize::new(0),
        };

        let references = ReferenceCatalog::inhaler();
        let actions = ActionCatalog::inhaler();
        let run = AnalyzerRun::new(
            "gemini-2.5-flash",
            &source,
            &model,
            &references,
            &actions,
            Duration::from_secs(5),
        );

        let result = run.execute().await.unwrap();

        assert_eq!(result.model, "gemini-2.5-flash");
        assert_eq!(result.reference_times["inhaler_in"], 3.0);
        assert_eq!(result.reference_times["face_on_inhaler"], 3.0);
        assert_eq!(result.reference_times["inhaler_out"], 6.0);
        assert!(result
            .statuses
            .values()
            .all(|s| *s == ScanStatus::Found));

        assert_eq!(result.store.reference_time("inhaler_in"), Some(3.0));
        assert_eq!(result.store.reference_time("inhaler_out"), Some(6.0));

        // sit_stand: two windows in stage 1 plus one in stage 2.
        assert_eq!(
            result.store.action_registry["sit_stand"].score_series.len(),
            3
        );
        // seal_lips: Q8 of stage 2 plus Q1 of both stage 3 windows.
        assert_eq!(
            result.store.action_registry["seal_lips"].score_series,
            vec![(3.0, 1), (3.0, 0), (6.0, 1)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_stage_degrades_but_continues() {
        // 8-second video. Stage 1 (segment 3): NO at 0, 3 -> exhausted at
        // 3.0 but committed. Stage 2 (segment 2, from 3): YES at 3.
        // Stage 3 (segment 3, from 3): YES at 3.
        let source = StubSource::new(8.0);
        let model = ScriptedModel {
            responses: vec![
                response("NO", &[(1, "NO", 0.5)]),
                response("NO", &[(1, "NO", 0.5)]),
                response("YES", &eight_yes()),
                response("YES", &six_answers("YES")),
            ],
            cursor: AtomicUsize::new(0),
        };

        let references = ReferenceCatalog::inhaler();
        let actions = ActionCatalog::inhaler();
        let run = AnalyzerRun::new(
            "gpt-4.1",
            &source,
            &model,
            &references,
            &actions,
            Duration::from_secs(5),
        );

        let result = run.execute().await.unwrap();

        assert_eq!(result.statuses["inhaler_in"], ScanStatus::Exhausted);
        assert_eq!(result.reference_times["inhaler_in"], 3.0);
        assert_eq!(result.statuses["face_on_inhaler"], ScanStatus::Found);
        assert_eq!(result.reference_times["face_on_inhaler"], 3.0);
        assert_eq!(result.statuses["inhaler_out"], ScanStatus::Found);
    }
}
