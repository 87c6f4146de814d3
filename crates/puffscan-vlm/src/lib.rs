//! Vision-language model access for PuffScan.
//!
//! Holds the supported-model table, provider HTTP clients (OpenAI chat
//! completions and Google generateContent), the dual-task prompt builder,
//! and the tolerant response parser.

pub mod capability;
pub mod client;
pub mod error;
pub mod parser;
pub mod prompt;

pub use capability::{capability_for, ModelCapability, Provider, SUPPORTED_MODELS};
pub use client::{QueryRequest, VisionQuery, VisionQueryClient};
pub use error::{VlmError, VlmResult};
pub use parser::{parse_response, Overall, ParsedResponse, QuestionVerdict};
pub use prompt::{build_scan_prompt, PromptPair, DEFAULT_SYSTEM_PROMPT};
