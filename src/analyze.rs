//! Analysis entry points.
//!
//! [`analyze`] runs one complete request/response cycle for files that are
//! already loaded; [`analyze_inputs`] also does the loading. Both either
//! return a fully validated [`AnalysisOutput`] or an error: there is no
//! partial result.

use crate::config::AnalysisConfig;
use crate::error::PyqError;
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::intake::{self, UploadedFile};
use crate::pipeline::llm::{AnalysisClient, GeminiClient, ProviderClient};
use crate::pipeline::{request, validate};
use edgequake_llm::ProviderFactory;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timeout used when fetching URL inputs.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Analyse already-loaded files.
///
/// # Errors
/// * [`PyqError::NoFiles`] — `files` is empty (checked first)
/// * [`PyqError::MissingCredential`] / [`PyqError::ProviderNotConfigured`] —
///   raised before any network call
/// * transport, timeout and contract errors from the call itself
pub async fn analyze(
    files: &[UploadedFile],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PyqError> {
    if files.is_empty() {
        return Err(PyqError::NoFiles);
    }
    let client = resolve_client(config)?;
    let outcome = run(client.as_ref(), files, config).await;

    if let Some(ref cb) = config.progress_callback {
        match &outcome {
            Ok(out) => cb.on_analysis_complete(out.result.entry_count()),
            Err(e) => cb.on_analysis_error(&e.to_string()),
        }
    }
    outcome
}

/// Load `inputs` (paths or URLs) and analyse them.
pub async fn analyze_inputs(
    inputs: &[String],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PyqError> {
    if inputs.is_empty() {
        return Err(PyqError::NoFiles);
    }
    // Resolve first so a missing key is reported before any file is read.
    resolve_client(config)?;
    let files =
        intake::load_inputs(inputs, DOWNLOAD_TIMEOUT_SECS, config.progress_callback.as_ref())
            .await?;
    analyze(&files, config).await
}

/// Synchronous wrapper around [`analyze_inputs`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    inputs: &[String],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PyqError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PyqError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_inputs(inputs, config))
}

async fn run(
    client: &dyn AnalysisClient,
    files: &[UploadedFile],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, PyqError> {
    let total_start = Instant::now();
    let req = request::build_request(files, config)?;
    let label = client.label();
    info!("Analysing {} files with {}", files.len(), label);

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(files.len(), &req.model);
    }

    let llm_start = Instant::now();
    let secs = config.api_timeout_secs;
    let text = match tokio::time::timeout(Duration::from_secs(secs), client.generate(&req)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("{} did not answer within {}s", label, secs);
            return Err(PyqError::ApiTimeout { secs });
        }
    };
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;
    let response_chars = text.as_deref().map_or(0, str::len);
    debug!("Response: {} chars in {}ms", response_chars, llm_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_response_received(response_chars, llm_duration_ms);
    }

    let result = validate::parse_response(text.as_deref())?;

    let stats = AnalysisStats {
        files: files.len(),
        input_bytes: files.iter().map(UploadedFile::size_bytes).sum(),
        response_chars,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        model: label,
    };
    info!(
        "Analysis complete: {} repeated, {} important, {} notes in {}ms",
        result.repeated_questions.len(),
        result.important_questions.len(),
        result.notes.len(),
        stats.total_duration_ms
    );
    Ok(AnalysisOutput { result, stats })
}

/// Resolve the analysis client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.client`) — used as-is; this is how
///    tests and embedding applications inject their own.
/// 2. **Named provider** (`config.provider_name`) — an edgequake-llm
///    provider created with the configured model; it reads its own API key
///    (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Native Gemini** — needs a key from the config or from
///    `GEMINI_API_KEY` / `API_KEY`. Without one this fails immediately with
///    [`PyqError::MissingCredential`], before any request is built.
pub fn resolve_client(config: &AnalysisConfig) -> Result<Arc<dyn AnalysisClient>, PyqError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    let model = config.model_or_default();

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            PyqError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderClient::new(provider, format!("{name}/{model}"))));
    }

    let api_key = config.resolve_api_key().ok_or(PyqError::MissingCredential)?;
    Ok(Arc::new(GeminiClient::new(
        api_key,
        config.api_base_url.clone(),
        model,
    )))
}
