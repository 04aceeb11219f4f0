//! Request construction: files + instructions + schema → [`AnalysisRequest`].
//!
//! The request is a plain value so it can be inspected in tests and handed
//! to any [`crate::pipeline::llm::AnalysisClient`] without the client
//! knowing where the files came from.

use crate::config::AnalysisConfig;
use crate::error::PyqError;
use crate::pipeline::intake::UploadedFile;
use crate::prompts::{response_schema, ANALYSIS_INSTRUCTION, SYSTEM_INSTRUCTION};
use serde_json::Value;
use tracing::debug;

/// One inline binary part of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePart {
    pub mime_type: String,
    /// Base64 payload, exactly as produced by intake.
    pub data: String,
}

/// Everything needed for the single external call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub model: String,
    /// File parts in submission order.
    pub parts: Vec<InlinePart>,
    /// Text part that follows the files in the user turn.
    pub instruction: String,
    /// System-level instruction.
    pub system_instruction: String,
    /// Output schema the response must follow.
    pub response_schema: Value,
    pub temperature: f32,
    pub max_output_tokens: usize,
}

impl AnalysisRequest {
    /// Sum of base64 payload lengths, for logging.
    pub fn payload_chars(&self) -> usize {
        self.parts.iter().map(|p| p.data.len()).sum()
    }
}

/// Build the request for `files`.
///
/// # Errors
/// [`PyqError::NoFiles`] when `files` is empty; nothing is sent in that case.
pub fn build_request(
    files: &[UploadedFile],
    config: &AnalysisConfig,
) -> Result<AnalysisRequest, PyqError> {
    if files.is_empty() {
        return Err(PyqError::NoFiles);
    }

    let parts: Vec<InlinePart> = files
        .iter()
        .map(|f| InlinePart {
            mime_type: f.mime_type().to_string(),
            data: f.base64_payload().to_string(),
        })
        .collect();

    let request = AnalysisRequest {
        model: config.model_or_default().to_string(),
        parts,
        instruction: ANALYSIS_INSTRUCTION.to_string(),
        system_instruction: config
            .system_prompt
            .clone()
            .unwrap_or_else(|| SYSTEM_INSTRUCTION.to_string()),
        response_schema: response_schema(),
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    };

    debug!(
        "Built request: {} parts, {} base64 chars, model {}",
        request.parts.len(),
        request.payload_chars(),
        request.model
    );
    Ok(request)
}
