//! Error types for vision model queries.

use thiserror::Error;

/// Result type for vision model operations.
pub type VlmResult<T> = Result<T, VlmError>;

/// Errors returned by provider clients.
#[derive(Debug, Error)]
pub enum VlmError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Invalid API credential for {provider}: {message}")]
    InvalidCredential { provider: String, message: String },

    #[error("Quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    #[error("Provider request failed (HTTP {status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl VlmError {
    /// Create an invalid credential error.
    pub fn invalid_credential(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCredential {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a request failure error.
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Whether continuing the scan is pointless.
    ///
    /// A bad credential or an unknown model fails every subsequent window
    /// the same way; callers abort on these.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredential { .. } | Self::UnsupportedModel(_)
        )
    }
}
