//! Worker configuration.

use std::time::Duration;

use puffscan_vlm::Provider;

use crate::error::{WorkerError, WorkerResult};

/// Scan worker configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Model ids to fan analysis out over
    pub models: Vec<String>,
    /// OpenAI API key, if any OpenAI model is configured
    pub openai_api_key: Option<String>,
    /// Google API key, if any Gemini model is configured
    pub google_api_key: Option<String>,
    /// Directory for report output
    pub work_dir: String,
    /// Per-query timeout for model calls
    pub query_timeout: Duration,
    /// Maximum analyzer runs in flight at once
    pub max_parallel_runs: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            models: vec!["gemini-2.5-flash".to_string()],
            openai_api_key: None,
            google_api_key: None,
            work_dir: "/tmp/puffscan".to_string(),
            query_timeout: Duration::from_secs(120),
            max_parallel_runs: 4,
        }
    }
}

impl ScanConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            models: std::env::var("PUFFSCAN_MODELS")
                .ok()
                .map(|s| parse_models(&s))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| vec!["gemini-2.5-flash".to_string()]),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            work_dir: std::env::var("PUFFSCAN_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/puffscan".to_string()),
            query_timeout: Duration::from_secs(
                std::env::var("PUFFSCAN_QUERY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            max_parallel_runs: std::env::var("PUFFSCAN_MAX_PARALLEL_RUNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        }
    }

    /// The credential for a provider, or a config error naming the variable.
    pub fn api_key_for(&self, provider: Provider) -> WorkerResult<String> {
        let (key, var) = match provider {
            Provider::OpenAi => (&self.openai_api_key, "OPENAI_API_KEY"),
            Provider::Google => (&self.google_api_key, "GOOGLE_API_KEY"),
        };
        key.clone()
            .ok_or_else(|| WorkerError::config_error(format!("{} not set", var)))
    }
}

fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
