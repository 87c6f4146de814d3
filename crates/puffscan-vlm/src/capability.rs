//! Supported model table.
//!
//! Each model id maps to its provider and hard limits. Requests are
//! clamped to these limits before they go on the wire; an id outside the
//! table is rejected up front rather than discovered mid-scan.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{VlmError, VlmResult};

/// Hosted model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Google,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Google => write!(f, "google"),
        }
    }
}

/// Static limits for one supported model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelCapability {
    pub provider: Provider,
    pub context_window: u32,
    pub max_output_tokens: u32,
    pub supports_vision: bool,
    pub supports_video: bool,
}

const OPENAI_VISION: ModelCapability = ModelCapability {
    provider: Provider::OpenAi,
    context_window: 128_000,
    max_output_tokens: 4_096,
    supports_vision: true,
    supports_video: true,
};

const GOOGLE_VISION: ModelCapability = ModelCapability {
    provider: Provider::Google,
    context_window: 1_000_000,
    max_output_tokens: 8_192,
    supports_vision: true,
    supports_video: true,
};

/// All model ids the client accepts, in table order.
pub const SUPPORTED_MODELS: &[(&str, ModelCapability)] = &[
    ("gpt-4.1", OPENAI_VISION),
    ("gpt-5-nano", OPENAI_VISION),
    ("gpt-5-mini", OPENAI_VISION),
    ("gpt-5.1", OPENAI_VISION),
    ("gemini-2.5-flash-lite", GOOGLE_VISION),
    ("gemini-2.5-flash", GOOGLE_VISION),
    ("gemini-2.5-pro", GOOGLE_VISION),
    ("gemini-3-pro-preview", GOOGLE_VISION),
];

/// Look up the capability for a model id.
pub fn capability_for(model: &str) -> VlmResult<ModelCapability> {
    SUPPORTED_MODELS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, cap)| *cap)
        .ok_or_else(|| VlmError::UnsupportedModel(model.to_string()))
}

/// Reasoning-series models reject `temperature` and `seed`.
pub fn omits_sampling_controls(model: &str) -> bool {
    model.starts_with("gpt-5") || model.starts_with("o1")
}

/// Newer OpenAI models take `max_completion_tokens` instead of `max_tokens`.
pub fn uses_max_completion_tokens(model: &str) -> bool {
    model.starts_with("gpt-5")
}
