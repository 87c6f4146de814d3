//! Structured scan logging utilities.
//!
//! Provides consistent, structured logging for analyzer runs with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

/// Scan logger for structured logging with consistent formatting.
///
/// Each analyzer run creates one logger per scan stage so every line
/// carries the model id and the stage it belongs to.
#[derive(Debug, Clone)]
pub struct ScanLogger {
    model: String,
    stage: String,
}

impl ScanLogger {
    /// Create a logger for one model's scan of one stage.
    pub fn new(model: &str, stage: &str) -> Self {
        Self {
            model: model.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Log the start of a scan stage.
    pub fn log_start(&self, message: &str) {
        info!(
            model = %self.model,
            stage = %self.stage,
            "Scan started: {}", message
        );
    }

    /// Log a progress update during a scan.
    pub fn log_progress(&self, message: &str) {
        info!(
            model = %self.model,
            stage = %self.stage,
            "Scan progress: {}", message
        );
    }

    /// Log a warning during a scan.
    pub fn log_warning(&self, message: &str) {
        warn!(
            model = %self.model,
            stage = %self.stage,
            "Scan warning: {}", message
        );
    }

    /// Log an error during a scan.
    pub fn log_error(&self, message: &str) {
        error!(
            model = %self.model,
            stage = %self.stage,
            "Scan error: {}", message
        );
    }

    /// Log the completion of a scan stage.
    pub fn log_completion(&self, message: &str) {
        info!(
            model = %self.model,
            stage = %self.stage,
            "Scan completed: {}", message
        );
    }

    /// Get the model id.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the stage name.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this scan stage.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "scan",
            model = %self.model,
            stage = %self.stage
        )
    }
}
