//! Fan-out execution of analyzer runs across model variants.
//!
//! The video is probed once; each configured model then runs a full
//! analyzer pass against its own frame source, bounded by a semaphore.
//! Completion order is irrelevant: results are immutable records joined
//! at the end, aggregated, and written to one report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use puffscan_media::{probe_video, FfmpegFrameSource};
use puffscan_models::{aggregate, ActionCatalog, ObservationStore, ReferenceCatalog};
use puffscan_vlm::{capability_for, VisionQueryClient};

use crate::analyzer::AnalyzerRun;
use crate::config::ScanConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::report::{write_report, FailedRun, RunReport, ScanReport};

/// Runs the full analysis for one video and writes the report.
pub struct Executor {
    config: ScanConfig,
    references: ReferenceCatalog,
    actions: ActionCatalog,
}

impl Executor {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            references: ReferenceCatalog::inhaler(),
            actions: ActionCatalog::inhaler(),
        }
    }

    /// Analyze a video with every configured model and write the report.
    ///
    /// A failed run is logged and carried in the report; the analysis
    /// succeeds as long as at least one run completes.
    pub async fn run(&self, video_path: &Path) -> WorkerResult<PathBuf> {
        if self.config.models.is_empty() {
            return Err(WorkerError::config_error("No models configured"));
        }

        // Validate models and credentials before touching the video.
        let mut clients = Vec::with_capacity(self.config.models.len());
        for model in &self.config.models {
            let capability = capability_for(model)?;
            let api_key = self.config.api_key_for(capability.provider)?;
            clients.push((model.clone(), VisionQueryClient::new(model.clone(), api_key)?));
        }

        let info = probe_video(video_path).await?;
        info!(
            video = %video_path.display(),
            duration = info.duration,
            models = self.config.models.len(),
            "Starting analysis"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_runs.max(1)));
        let mut handles = Vec::with_capacity(clients.len());

        for (model, client) in clients {
            let semaphore = semaphore.clone();
            let path = video_path.to_path_buf();
            let references = self.references.clone();
            let actions = self.actions.clone();
            let query_timeout = self.config.query_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerError::analysis_failed("run semaphore closed"))?;

                // Each run opens its own read-only source over the file.
                let source = FfmpegFrameSource::open(&path).await?;
                AnalyzerRun::new(
                    &model,
                    &source,
                    &client,
                    &references,
                    &actions,
                    query_timeout,
                )
                .execute()
                .await
            }));
        }

        let mut runs = Vec::new();
        let mut failed_runs = Vec::new();
        for (model, handle) in self.config.models.iter().zip(handles) {
            match handle.await {
                Ok(Ok(result)) => runs.push(result),
                Ok(Err(e)) => {
                    error!(model = %model, error = %e, "Analyzer run failed");
                    failed_runs.push(FailedRun {
                        model: model.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(model = %model, error = %e, "Analyzer task panicked");
                    failed_runs.push(FailedRun {
                        model: model.clone(),
                        error: format!("task join error: {}", e),
                    });
                }
            }
        }

        if runs.is_empty() {
            return Err(WorkerError::NoSuccessfulRuns);
        }

        let stores: Vec<ObservationStore> = runs.iter().map(|r| r.store.clone()).collect();
        let aggregated = aggregate(&stores)?;

        let report = ScanReport {
            generated_at: Utc::now(),
            video: info,
            runs: runs.into_iter().map(RunReport::from).collect(),
            failed_runs,
            aggregated,
        };

        let report_path = write_report(Path::new(&self.config.work_dir), &report).await?;
        info!(report = %report_path.display(), "Analysis complete");
        Ok(report_path)
    }
}
