//! # pyq-analyzer
//!
//! Analyse scanned previous-year exam papers (PYQs) with a single
//! schema-constrained LLM call and turn the answer into revision material.
//!
//! ## Why this crate?
//!
//! Students sit on piles of past papers, but spotting which questions keep
//! coming back means reading all of them side by side. This crate sends the
//! papers (images or PDFs, as inline base64 parts) to a multimodal model in
//! one request, with a fixed JSON output schema, and gets back four sections:
//! repeated questions with counts and years, important questions, a top-15
//! list and topic-wise revision notes. The answer is validated against the
//! schema before anything is shown or exported.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files / URLs
//!  │
//!  ├─ 1. Intake    detect MIME, base64-encode, ordered queue
//!  ├─ 2. Request   inline parts + instruction + system prompt + schema
//!  ├─ 3. LLM       one call to Gemini (or any edgequake-llm provider), with timeout
//!  ├─ 4. Validate  parse JSON, walk it against the schema
//!  ├─ 5. Session   Idle → Analyzing → Completed | Error
//!  └─ 6. Output    terminal tabs, PDF and plain-text export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pyq_analyzer::{analyze_inputs, AnalysisConfig};
//! use pyq_analyzer::export::{export_to_dir, ExportFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY (or API_KEY)
//!     let config = AnalysisConfig::default();
//!     let inputs = vec!["physics-2022.pdf".to_string(), "physics-2023.jpg".to_string()];
//!     let output = analyze_inputs(&inputs, &config).await?;
//!     for q in &output.result.repeated_questions {
//!         println!("{} (asked {} times)", q.question, q.count);
//!     }
//!     export_to_dir(&output.result, ExportFormat::Pdf, ".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Session Use
//!
//! Interactive front-ends drive a [`Session`] instead of calling
//! [`analyze`] directly; [`spawn_analysis`] runs the call on a tokio task
//! and a [`Session::reset`] while it is in flight makes the late result a
//! no-op.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pyq` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pyq-analyzer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod preferences;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod theme;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_inputs, analyze_sync};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::PyqError;
pub use output::{AnalysisOutput, AnalysisResult, AnalysisStats, RepeatedQuestion, RevisionNote};
pub use pipeline::intake::UploadedFile;
pub use pipeline::llm::{AnalysisClient, GeminiClient, ProviderClient};
pub use pipeline::request::AnalysisRequest;
pub use preferences::Preferences;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{spawn_analysis, AnalysisTicket, Session, SessionState, SharedSession};
pub use theme::Theme;
pub use view::{Renderer, ResultTab};
