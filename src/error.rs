//! Error types for the pyq-analyzer library.
//!
//! Every failure is fatal to the operation that raised it: an analysis
//! either produces a complete [`crate::output::AnalysisResult`] or nothing.
//! The variants are grouped the way a caller reacts to them:
//!
//! * **configuration**: fix the environment and rerun;
//! * **transport / service**: the external call failed, message is verbatim;
//! * **contract violation**: the model answered, but not with the schema;
//! * **input**: the file list or a file on disk is unusable;
//! * **session / export**: misuse of the state machine or a failed write.
//!
//! The session controller stores `to_string()` of any of these as the
//! user-facing message of the `Error` state.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pyq-analyzer library.
#[derive(Debug, Error)]
pub enum PyqError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key was configured for the native Gemini client.
    #[error(
        "No API key configured for the analysis service.\n\
Set GEMINI_API_KEY (or API_KEY), or pass --api-key."
    )]
    MissingCredential,

    /// A named edgequake-llm provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Transport / service errors ────────────────────────────────────────
    /// The HTTP request could not be sent or its body could not be read.
    #[error("Request to the analysis service failed: {message}")]
    Transport { message: String },

    /// The service rejected the credential (401/403).
    #[error("Authentication error from '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The service returned HTTP 429.
    #[error("Rate limit exceeded for '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success HTTP status.
    #[error("Analysis service returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },

    /// The call did not finish within the configured timeout.
    #[error("Analysis call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    // ── Contract violations ───────────────────────────────────────────────
    /// The service answered without any text to parse.
    #[error("No response received from the analysis service")]
    NoResponse,

    /// The response text is not valid JSON.
    #[error("Failed to parse the analysis response as JSON: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },

    /// The response is JSON but does not match the declared schema.
    #[error("Analysis response does not match the expected schema: {detail}")]
    SchemaViolation { detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Submission was attempted with an empty file list.
    #[error("No files to analyse. Add at least one exam paper first.")]
    NoFiles,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is neither an image nor a PDF.
    #[error("Unsupported file type for '{name}': only images and PDF documents are accepted")]
    UnsupportedFileType { name: String },

    /// The file has zero bytes.
    #[error("File '{name}' is empty")]
    EmptyFile { name: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The requested action is not allowed in the current session state.
    #[error("Cannot {action} while the session is {state}")]
    InvalidState { action: &'static str, state: String },

    /// `remove_file` was given an index past the end of the queue.
    #[error("File index {index} is out of range (queue has {len} files)")]
    FileIndexOutOfRange { index: usize, len: usize },

    // ── Export / I/O errors ───────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF export needs the pdfium shared library. Either:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium, or\n\
  • Install libpdfium where the system loader can find it.\n\
Plain-text export (--format txt) works without it.\n"
    )]
    PdfiumBindingFailed(String),

    /// pdfium returned an error while building the document.
    #[error("PDF export failed: {0}")]
    PdfRenderFailed(String),

    /// Could not create or write an export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Preferences file could not be written.
    #[error("Failed to save preferences to '{path}': {detail}")]
    Preferences { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PyqError {
    /// True for failures that happened before any network call was attempted.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            PyqError::MissingCredential
                | PyqError::ProviderNotConfigured { .. }
                | PyqError::InvalidConfig(_)
                | PyqError::NoFiles
        )
    }

    /// True when the service answered but the answer broke the response contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PyqError::NoResponse | PyqError::MalformedJson { .. } | PyqError::SchemaViolation { .. }
        )
    }
}
