//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("No analyzer run completed successfully")]
    NoSuccessfulRuns,

    #[error("Vision model error: {0}")]
    Vlm(#[from] puffscan_vlm::VlmError),

    #[error("Media error: {0}")]
    Media(#[from] puffscan_media::MediaError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] puffscan_models::AggregateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    /// Whether a scan must abort instead of skipping the failed window.
    pub fn is_fatal(&self) -> bool {
        match self {
            WorkerError::Vlm(e) => e.is_fatal(),
            WorkerError::ConfigError(_) | WorkerError::NoSuccessfulRuns => true,
            _ => false,
        }
    }
}
