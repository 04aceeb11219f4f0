//! The external call: send an [`AnalysisRequest`], get the raw response text.
//!
//! [`AnalysisClient`] is the seam between the pipeline and the outside
//! world. Two implementations ship with the crate:
//!
//! * [`GeminiClient`] talks to the Gemini REST API directly and declares the
//!   schema through `generationConfig.responseSchema`, so the service itself
//!   constrains the output.
//! * [`ProviderClient`] wraps any `edgequake_llm` provider. Those providers
//!   only take free text, so the schema is spelled out in the system prompt
//!   and validation has to catch any drift.
//!
//! Clients return the text untouched; parsing and schema checks live in
//! [`crate::pipeline::validate`]. There is no retry here: one request, one
//! outcome.

use crate::error::PyqError;
use crate::pipeline::request::AnalysisRequest;
use crate::prompts::system_instruction_with_schema;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest error body carried into a [`PyqError::ServiceError`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Anything that can answer an [`AnalysisRequest`].
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Short label for logs and stats, e.g. `gemini/gemini-2.5-flash`.
    fn label(&self) -> String;

    /// Perform the call. `Ok(None)` means the service answered without text.
    async fn generate(&self, request: &AnalysisRequest) -> Result<Option<String>, PyqError>;
}

// ── Native Gemini client ─────────────────────────────────────────────────

/// Direct client for `models/{model}:generateContent`.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Serialise the wire body for `request`.
pub(crate) fn gemini_request_body(request: &AnalysisRequest) -> GeminiRequest {
    let mut parts: Vec<GeminiPart> = request
        .parts
        .iter()
        .map(|p| GeminiPart::InlineData {
            inline_data: InlineData {
                mime_type: p.mime_type.clone(),
                data: p.data.clone(),
            },
        })
        .collect();
    parts.push(GeminiPart::Text {
        text: request.instruction.clone(),
    });

    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: request.system_instruction.clone(),
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: request.response_schema.clone(),
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        },
    }
}

/// Concatenate the text parts of the first candidate.
///
/// Returns `None` when the prompt was blocked, there is no candidate, or the
/// candidate carries no text at all.
pub(crate) fn extract_text(response: GeminiResponse) -> Option<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        warn!("Prompt blocked by the service: {}", reason);
        return None;
    }
    let candidate = response.candidates.into_iter().next()?;
    if let Some(ref reason) = candidate.finish_reason {
        debug!("Candidate finish reason: {}", reason);
    }
    let text: String = candidate
        .content?
        .parts
        .into_iter()
        .filter_map(|p| match p {
            GeminiPart::Text { text } => Some(text),
            _ => None,
        })
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    fn label(&self) -> String {
        format!("gemini/{}", self.model)
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<Option<String>, PyqError> {
        let body = gemini_request_body(request);
        let url = self.endpoint(&request.model);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PyqError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response.text().await.map_err(|e| PyqError::Transport {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text, retry_after));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| PyqError::Transport {
            message: format!("unreadable response envelope: {e}"),
        })?;
        Ok(extract_text(parsed))
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn status_error(status: u16, body: &str, retry_after_secs: Option<u64>) -> PyqError {
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status {
        401 | 403 => PyqError::AuthError {
            provider: "gemini".to_string(),
            detail: body,
        },
        429 => PyqError::RateLimitExceeded {
            provider: "gemini".to_string(),
            retry_after_secs,
        },
        _ => PyqError::ServiceError { status, body },
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter that routes the request through an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

/// Chat messages for a free-text provider: system prompt with the schema
/// embedded, then one user turn carrying every file and the instruction.
fn provider_messages(request: &AnalysisRequest) -> Vec<ChatMessage> {
    let images: Vec<ImageData> = request
        .parts
        .iter()
        .map(|p| ImageData::new(p.data.clone(), p.mime_type.as_str()))
        .collect();
    vec![
        ChatMessage::system(system_instruction_with_schema(&request.system_instruction)),
        ChatMessage::user_with_images(request.instruction.as_str(), images),
    ]
}

#[async_trait]
impl AnalysisClient for ProviderClient {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<Option<String>, PyqError> {
        let messages = provider_messages(request);
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_output_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PyqError::Transport {
                message: format!("{e}"),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(response.content))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::request::InlinePart;
    use crate::pipeline::validate::parse_response;
    use crate::prompts::{response_schema, SCHEMA_PREAMBLE};
    use edgequake_llm::{ChatRole, MockProvider};

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            model: "gemini-2.5-flash".into(),
            parts: vec![
                InlinePart {
                    mime_type: "application/pdf".into(),
                    data: "QUFB".into(),
                },
                InlinePart {
                    mime_type: "image/png".into(),
                    data: "QkJC".into(),
                },
            ],
            instruction: "Analyse.".into(),
            system_instruction: "Be strict.".into(),
            response_schema: response_schema(),
            temperature: 0.2,
            max_output_tokens: 1024,
        }
    }

    #[test]
    fn request_body_layout() {
        let body = serde_json::to_value(gemini_request_body(&request())).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "QUFB");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        // Instruction text trails the files.
        assert_eq!(parts[2]["text"], "Analyse.");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be strict.");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"][2],
            "top15"
        );
    }

    #[test]
    fn extract_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(resp).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn extract_text_none_without_candidates() {
        let resp: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(resp).is_none());
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(resp).is_none());
    }

    #[test]
    fn extract_text_none_when_blocked() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert!(extract_text(resp).is_none());
    }

    #[test]
    fn extract_text_none_for_empty_content() {
        let raw = r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert!(extract_text(resp).is_none());
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(401, "bad key", None), PyqError::AuthError { .. }));
        assert!(matches!(status_error(403, "", None), PyqError::AuthError { .. }));
        match status_error(429, "", Some(12)) {
            PyqError::RateLimitExceeded { retry_after_secs, .. } => {
                assert_eq!(retry_after_secs, Some(12))
            }
            other => panic!("unexpected {other:?}"),
        }
        let long = "x".repeat(2_000);
        match status_error(500, &long, None) {
            PyqError::ServiceError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("k", "https://example.test/v1beta", "gemini-2.5-flash");
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.label(), "gemini/gemini-2.5-flash");
    }

    #[test]
    fn provider_messages_carry_schema_and_files() {
        let messages = provider_messages(&request());
        assert_eq!(messages.len(), 2);

        let system = &messages[0];
        assert_eq!(system.role, ChatRole::System);
        assert!(system.content.starts_with("Be strict."));
        assert!(system.content.contains(SCHEMA_PREAMBLE));
        assert!(system.content.contains("\"top15\""));
        assert!(system.images.is_none());

        let user = &messages[1];
        assert_eq!(user.role, ChatRole::User);
        assert_eq!(user.content, "Analyse.");
        let images = user.images.as_ref().unwrap();
        let parts: Vec<(&str, &str)> = images
            .iter()
            .map(|i| (i.mime_type.as_str(), i.data.as_str()))
            .collect();
        assert_eq!(parts, vec![("application/pdf", "QUFB"), ("image/png", "QkJC")]);
    }

    #[tokio::test]
    async fn provider_client_returns_reply_text() {
        let mock = MockProvider::new();
        mock.add_response(r#"{"top15": []}"#).await;
        let client = ProviderClient::new(Arc::new(mock), "mock/test");

        let reply = client.generate(&request()).await.unwrap();
        assert_eq!(reply.as_deref(), Some(r#"{"top15": []}"#));
        assert_eq!(client.label(), "mock/test");
    }

    #[tokio::test]
    async fn provider_client_blank_reply_is_no_response() {
        let mock = MockProvider::new();
        mock.add_response("  \n\t ").await;
        let client = ProviderClient::new(Arc::new(mock), "mock/test");

        let reply = client.generate(&request()).await.unwrap();
        assert!(reply.is_none());
        assert!(matches!(
            parse_response(reply.as_deref()),
            Err(PyqError::NoResponse)
        ));
    }
}
