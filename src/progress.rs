//! Progress-callback trait for analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to follow a
//! run: files loaded, request sent, response received, and the final
//! outcome. The CLI forwards these to a spinner; a GUI could forward them
//! to its event loop.
//!
//! # Example
//!
//! ```rust
//! use pyq_analyzer::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl AnalysisProgressCallback for Log {
//!     fn on_request_start(&self, files: usize, model: &str) {
//!         eprintln!("sending {files} files to {model}");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Log))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the analysis pipeline as it moves through its stages.
///
/// All methods default to no-ops so callers only override what they need.
/// Implementations must be `Send + Sync`: files are loaded concurrently and
/// [`crate::session::spawn_analysis`] runs on a tokio worker.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called after each file has been read and encoded.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the submission order
    /// * `total` — number of files being loaded
    /// * `name`  — file name shown to the user
    /// * `bytes` — raw size on disk
    fn on_file_loaded(&self, index: usize, total: usize, name: &str, bytes: u64) {
        let _ = (index, total, name, bytes);
    }

    /// Called just before the external call is made.
    fn on_request_start(&self, files: usize, model: &str) {
        let _ = (files, model);
    }

    /// Called when the service has answered, before validation.
    fn on_response_received(&self, response_chars: usize, elapsed_ms: u64) {
        let _ = (response_chars, elapsed_ms);
    }

    /// Called once with the number of entries in a validated result.
    fn on_analysis_complete(&self, entries: usize) {
        let _ = entries;
    }

    /// Called once when the run fails at any stage after it started.
    fn on_analysis_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
