//! Configuration for an analysis run.
//!
//! Everything that changes how the external call is made lives in
//! [`AnalysisConfig`], built via [`AnalysisConfigBuilder`]. The builder
//! clamps numeric knobs on the way in and `build()` rejects combinations
//! that can never work.

use crate::error::PyqError;
use crate::pipeline::llm::AnalysisClient;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base URL of the Gemini REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for one analysis call.
///
/// # Example
/// ```rust
/// use pyq_analyzer::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-2.5-pro")
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, 90);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// API key for the native Gemini client.
    ///
    /// If None, `GEMINI_API_KEY` and then `API_KEY` are read from the
    /// environment when the client is resolved.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Name of an edgequake-llm provider (e.g. "openai", "anthropic").
    ///
    /// When set, the request goes through that provider instead of the
    /// native Gemini client and the schema is embedded in the system prompt.
    pub provider_name: Option<String>,

    /// Pre-constructed client. Takes precedence over everything else.
    pub client: Option<Arc<dyn AnalysisClient>>,

    /// Sampling temperature. Range 0.0–2.0. Default: 0.2.
    ///
    /// Kept low: the model is counting and grouping questions, not writing.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// Fifteen top questions plus notes for a full syllabus regularly pass
    /// 4 000 tokens; a truncated response fails JSON parsing.
    pub max_output_tokens: usize,

    /// Timeout for the external call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system instruction. If None, uses [`crate::prompts::SYSTEM_INSTRUCTION`].
    pub system_prompt: Option<String>,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            provider_name: None,
            client: None,
            temperature: 0.2,
            max_output_tokens: 8192,
            api_timeout_secs: 120,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|_| "<dyn AnalysisClient>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|s| s.len()))
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured model, or [`DEFAULT_MODEL`].
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// The configured API key, falling back to `GEMINI_API_KEY` then `API_KEY`.
    ///
    /// Empty strings count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env_non_empty("GEMINI_API_KEY"))
            .or_else(|| env_non_empty("API_KEY"))
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn AnalysisClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, PyqError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(PyqError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(PyqError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(PyqError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if let Some(ref prompt) = c.system_prompt {
            if prompt.trim().is_empty() {
                return Err(PyqError::InvalidConfig("system prompt is empty".into()));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert_eq!(c.api_timeout_secs, 120);
        assert_eq!(c.max_output_tokens, 8192);
        assert!((c.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn temperature_is_clamped() {
        let c = AnalysisConfig::builder().temperature(9.0).build().unwrap();
        assert!((c.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = AnalysisConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, PyqError::InvalidConfig(_)));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = AnalysisConfig::builder()
            .api_base_url("http://localhost:8080/v1beta/")
            .build()
            .unwrap();
        assert_eq!(c.api_base_url, "http://localhost:8080/v1beta");
    }

    #[test]
    fn explicit_key_wins_over_env() {
        let c = AnalysisConfig::builder().api_key("explicit").build().unwrap();
        assert_eq!(c.resolve_api_key().as_deref(), Some("explicit"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = AnalysisConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
