//! JSON report output.
//!
//! The report is the reporting boundary of the worker: video metadata,
//! every run's store and per-stage summary, failed runs, and the
//! aggregated view, written as one timestamped JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use puffscan_media::VideoInfo;
use puffscan_models::{AggregatedStore, ObservationStore};

use crate::analyzer::RunResult;
use crate::error::WorkerResult;
use crate::scanner::ScanStatus;

/// One successful run's section of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub model: String,
    pub reference_times: BTreeMap<String, f64>,
    pub statuses: BTreeMap<String, ScanStatus>,
    pub store: ObservationStore,
}

impl From<RunResult> for RunReport {
    fn from(result: RunResult) -> Self {
        Self {
            model: result.model,
            reference_times: result.reference_times,
            statuses: result.statuses,
            store: result.store,
        }
    }
}

/// A run that did not finish; kept in the report for diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRun {
    pub model: String,
    pub error: String,
}

/// The complete analysis report for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub video: VideoInfo,
    pub runs: Vec<RunReport>,
    pub failed_runs: Vec<FailedRun>,
    pub aggregated: AggregatedStore,
}

/// Write the report as pretty JSON into the work directory.
pub async fn write_report(work_dir: &Path, report: &ScanReport) -> WorkerResult<PathBuf> {
    tokio::fs::create_dir_all(work_dir).await?;

    let filename = format!(
        "puffscan_report_{}.json",
        report.generated_at.format("%Y%m%d_%H%M%S")
    );
    let path = work_dir.join(filename);

    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(&path, json).await?;

    info!(path = %path.display(), runs = report.runs.len(), "Report written");
    Ok(path)
}
