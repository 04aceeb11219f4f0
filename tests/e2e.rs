//! End-to-end tests against the live Gemini API.
//!
//! These use real question papers in `./test_cases/` and make a paid API
//! call. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test e2e -- --nocapture

use pyq_analyzer::export::{export_to_dir, ExportFormat};
use pyq_analyzer::output::TOP_QUESTION_COUNT;
use pyq_analyzer::{analyze_inputs, AnalysisConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Every image or PDF under `test_cases/`, sorted by name.
fn sample_papers() -> Vec<String> {
    let mut papers: Vec<String> = std::fs::read_dir(test_cases_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .and_then(|x| x.to_str())
                        .is_some_and(|x| matches!(x, "pdf" | "png" | "jpg" | "jpeg" | "webp"))
                })
                .map(|p| p.display().to_string())
                .collect()
        })
        .unwrap_or_default();
    papers.sort();
    papers
}

/// Skip this test unless E2E_ENABLED is set and sample papers exist.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let papers = sample_papers();
        if papers.is_empty() {
            println!("SKIP — no question papers in {}", test_cases_dir().display());
            return;
        }
        papers
    }};
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_analysis_and_export() {
    let papers = e2e_skip_unless_ready!();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let config = AnalysisConfig::builder()
        .api_timeout_secs(180)
        .build()
        .unwrap();

    let output = analyze_inputs(&papers, &config)
        .await
        .expect("live analysis failed");

    let result = &output.result;
    assert_eq!(result.top_15.len(), TOP_QUESTION_COUNT);
    assert!(!result.notes.is_empty(), "expected at least one revision note");
    for q in &result.repeated_questions {
        assert!(!q.question.is_empty());
        assert!(q.count >= 1);
    }
    println!(
        "{} repeated, {} important, {} notes in {}ms ({})",
        result.repeated_questions.len(),
        result.important_questions.len(),
        result.notes.len(),
        output.stats.total_duration_ms,
        output.stats.model
    );

    let dir = tempfile::tempdir().unwrap();
    let path = export_to_dir(result, ExportFormat::Text, dir.path())
        .await
        .unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("Top 15 Questions"));
}
