//! Provider clients for vision queries.
//!
//! One client wraps one model id and speaks whichever wire dialect its
//! provider requires. Calls are stateless; the conversation never carries
//! over between windows, so each query stands alone.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::{
    capability_for, omits_sampling_controls, uses_max_completion_tokens, ModelCapability, Provider,
};
use crate::error::{VlmError, VlmResult};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One stateless query: prompts plus an optional JPEG composite.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub system: String,
    pub user: String,
    pub image_jpeg: Option<Vec<u8>>,
}

/// Something that can answer a vision query with raw model text.
///
/// The scanner depends on this trait, not on a concrete provider, so
/// tests drive it with scripted responses.
#[async_trait]
pub trait VisionQuery: Send + Sync {
    fn model(&self) -> &str;

    async fn query(&self, request: &QueryRequest) -> VlmResult<String>;
}

/// HTTP client for one supported model.
pub struct VisionQueryClient {
    model: String,
    capability: ModelCapability,
    api_key: String,
    http: Client,
    openai_base: String,
    google_base: String,
}

impl VisionQueryClient {
    /// Create a client for a model id, rejecting ids outside the table.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> VlmResult<Self> {
        let model = model.into();
        let capability = capability_for(&model)?;

        Ok(Self {
            model,
            capability,
            api_key: api_key.into(),
            http: Client::new(),
            openai_base: OPENAI_BASE_URL.to_string(),
            google_base: GOOGLE_BASE_URL.to_string(),
        })
    }

    pub fn capability(&self) -> &ModelCapability {
        &self.capability
    }

    /// Override the provider endpoints (tests point these at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.openai_base = base_url.clone();
        self.google_base = base_url;
        self
    }

    async fn query_openai(&self, request: &QueryRequest) -> VlmResult<String> {
        let mut content = vec![ContentBlock::Text {
            text: request.user.clone(),
        }];

        if let Some(jpeg) = self.vision_payload(request) {
            let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
            content.push(ContentBlock::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/jpeg;base64,{}", encoded),
                },
            });
        }

        let sampling = !omits_sampling_controls(&self.model);
        let max_tokens = self.capability.max_output_tokens;
        let body = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: MessageContent::Text(request.system.clone()),
                },
                OpenAiMessage {
                    role: "user",
                    content: MessageContent::Blocks(content),
                },
            ],
            temperature: sampling.then_some(0.0),
            seed: sampling.then_some(1),
            max_tokens: (!uses_max_completion_tokens(&self.model)).then_some(max_tokens),
            max_completion_tokens: uses_max_completion_tokens(&self.model).then_some(max_tokens),
        };

        debug!(model = %self.model, "Sending OpenAI chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.openai_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_provider_error(
                Provider::OpenAi,
                status.as_u16(),
                &body,
            ));
        }

        let parsed: OpenAiResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(VlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn query_google(&self, request: &QueryRequest) -> VlmResult<String> {
        // Gemini has no separate system role here; fold it into the text.
        let text = if request.system.is_empty() {
            request.user.clone()
        } else {
            format!("{}\n\n{}", request.system, request.user)
        };

        let mut parts = vec![GeminiPart::Text { text }];
        if let Some(jpeg) = self.vision_payload(request) {
            parts.push(GeminiPart::InlineData {
                inline_data: InlineData {
                    mime_type: "image/jpeg".to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(jpeg),
                },
            });
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent { parts }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: self.capability.max_output_tokens,
            },
        };

        debug!(model = %self.model, "Sending Gemini generateContent request");

        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent?key={}",
                self.google_base, self.model, self.api_key
            ))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_provider_error(
                Provider::Google,
                status.as_u16(),
                &body,
            ));
        }

        let parsed: GeminiResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(VlmError::EmptyResponse);
        }
        Ok(text)
    }

    /// The image bytes to attach, if the model can take them.
    fn vision_payload<'a>(&self, request: &'a QueryRequest) -> Option<&'a [u8]> {
        let jpeg = request.image_jpeg.as_deref()?;
        if !self.capability.supports_vision {
            warn!(
                model = %self.model,
                "Model does not support vision; sending text only"
            );
            return None;
        }
        Some(jpeg)
    }
}

#[async_trait]
impl VisionQuery for VisionQueryClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn query(&self, request: &QueryRequest) -> VlmResult<String> {
        match self.capability.provider {
            Provider::OpenAi => self.query_openai(request).await,
            Provider::Google => self.query_google(request).await,
        }
    }
}

/// Map a non-2xx provider response to a typed error.
fn classify_provider_error(provider: Provider, status: u16, body: &str) -> VlmError {
    let lower = body.to_lowercase();

    if status == 401 || status == 403 || lower.contains("invalid api key") {
        return VlmError::invalid_credential(provider.to_string(), truncate(body));
    }
    if status == 429 || lower.contains("quota") || lower.contains("rate limit") {
        return VlmError::QuotaExceeded(truncate(body));
    }
    if lower.contains("context length") || lower.contains("maximum context") {
        return VlmError::ContextLengthExceeded(truncate(body));
    }
    VlmError::request_failed(status, truncate(body))
}

fn truncate(body: &str) -> String {
    let mut message = body
        .char_indices()
        .nth(500)
        .map(|(i, _)| &body[..i])
        .unwrap_or(body)
        .to_string();
    if message.len() < body.len() {
        message.push('…');
    }
    message
}

// OpenAI wire types.

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

// Gemini wire types.

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request_with_image() -> QueryRequest {
        QueryRequest {
            system: "You are a careful observer.".to_string(),
            user: "Is the subject standing?".to_string(),
            image_jpeg: Some(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        }
    }

    #[tokio::test]
    async fn test_openai_request_shape_and_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4.1",
                "temperature": 0.0,
                "seed": 1,
                "max_tokens": 4096,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Overall_Answer: NO"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VisionQueryClient::new("gpt-4.1", "test-key")
            .unwrap()
            .with_base_url(server.uri());

        let text = client.query(&request_with_image()).await.unwrap();
        assert_eq!(text, "Overall_Answer: NO");
    }

    #[tokio::test]
    async fn test_openai_reasoning_models_omit_sampling_controls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-5-mini",
                "max_completion_tokens": 4096,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Overall_Answer: YES"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VisionQueryClient::new("gpt-5-mini", "test-key")
            .unwrap()
            .with_base_url(server.uri());

        // The partial-json matcher above proves max_completion_tokens is
        // used; temperature/seed absence is checked on the raw body.
        let text = client.query(&request_with_image()).await.unwrap();
        assert_eq!(text, "Overall_Answer: YES");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("seed").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_gemini_request_shape_and_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r"/models/gemini-2\.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [
                    {"text": "Overall_Answer: "},
                    {"text": "YES"}
                ]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VisionQueryClient::new("gemini-2.5-flash", "test-key")
            .unwrap()
            .with_base_url(server.uri());

        let text = client.query(&request_with_image()).await.unwrap();
        assert_eq!(text, "Overall_Answer: YES");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let parts = &body["contents"][0]["parts"];
        // System prompt is folded into the text part; image rides inline.
        assert!(parts[0]["text"]
            .as_str()
            .unwrap()
            .starts_with("You are a careful observer."));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_invalid_credential() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid api key"}"#),
            )
            .mount(&server)
            .await;

        let client = VisionQueryClient::new("gpt-4.1", "bad-key")
            .unwrap()
            .with_base_url(server.uri());

        let err = client.query(&request_with_image()).await.unwrap_err();
        assert!(matches!(err, VlmError::InvalidCredential { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_quota() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r":generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let client = VisionQueryClient::new("gemini-2.5-pro", "test-key")
            .unwrap()
            .with_base_url(server.uri());

        let err = client.query(&request_with_image()).await.unwrap_err();
        assert!(matches!(err, VlmError::QuotaExceeded(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_empty_choices_is_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = VisionQueryClient::new("gpt-4.1", "test-key")
            .unwrap()
            .with_base_url(server.uri());

        let err = client.query(&request_with_image()).await.unwrap_err();
        assert!(matches!(err, VlmError::EmptyResponse));
    }
}
