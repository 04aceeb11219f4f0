//! Integration tests for the analysis flow against a scripted client.
//!
//! No network: every test injects a [`ScriptedClient`] through
//! `AnalysisConfig::client`, so these run everywhere.
//!
//! Run with:
//!   cargo test --test session_flow

use async_trait::async_trait;
use pyq_analyzer::analyze::{analyze, analyze_inputs};
use pyq_analyzer::pipeline::intake::UploadedFile;
use pyq_analyzer::{
    spawn_analysis, AnalysisClient, AnalysisConfig, AnalysisRequest, AnalysisResult, PyqError,
    Session, SessionState, SharedSession,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Returns a fixed reply, optionally after waiting for a gate or a delay.
struct ScriptedClient {
    reply: Option<String>,
    gate: Option<Arc<Notify>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<AnalysisRequest>>,
}

impl ScriptedClient {
    fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            gate: None,
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    fn label(&self) -> String {
        "scripted/test".to_string()
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<Option<String>, PyqError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.reply.clone())
    }
}

fn valid_payload() -> serde_json::Value {
    let top: Vec<String> = (1..=15).map(|i| format!("Top question {i}")).collect();
    json!({
        "repeatedQuestions": [
            {"questionText": "Explain Ohm's law.", "occurrenceCount": 3, "years": ["2019", "2021", "2023"]},
            {"questionText": "Define drift velocity.", "occurrenceCount": 2, "years": ["2020", "2022"]}
        ],
        "importantQuestions": ["Derive the lens formula.", "State Gauss's law.", "Explain TIR."],
        "top15": top,
        "notes": [{"topic": "Current Electricity", "bulletPoints": ["V = IR", "Series resistances add"]}]
    })
}

fn config_with(client: Arc<ScriptedClient>) -> AnalysisConfig {
    AnalysisConfig::builder()
        .client(client)
        .api_timeout_secs(5)
        .build()
        .unwrap()
}

fn paper(name: &str) -> UploadedFile {
    // Minimal PNG signature is enough: the client never decodes it.
    UploadedFile::from_bytes(name, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap()
}

fn session_with(files: &[&str]) -> SharedSession {
    let mut s = Session::new();
    for f in files {
        s.add_file(paper(f)).unwrap();
    }
    Arc::new(Mutex::new(s))
}

// ── Session outcomes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_call_completes_with_exact_payload() {
    let payload = valid_payload();
    let client = Arc::new(ScriptedClient::replying(Some(&payload.to_string())));
    let session = session_with(&["2021.png", "2022.png"]);

    let handle = spawn_analysis(&session, config_with(client.clone())).unwrap();
    assert_eq!(session.lock().unwrap().state(), SessionState::Analyzing);
    assert!(handle.await.unwrap());

    let s = session.lock().unwrap();
    assert_eq!(s.state(), SessionState::Completed);
    let expected: AnalysisResult = serde_json::from_value(payload).unwrap();
    assert_eq!(s.result(), Some(&expected));
    assert!(s.error().is_none());
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_carries_files_in_order_with_schema() {
    let client = Arc::new(ScriptedClient::replying(Some(&valid_payload().to_string())));
    let files = vec![
        UploadedFile::new("a.png", "image/png", "QUFB").unwrap(),
        UploadedFile::new("b.pdf", "application/pdf", "QkJC").unwrap(),
    ];
    analyze(&files, &config_with(client.clone())).await.unwrap();

    let req = client.last_request.lock().unwrap().clone().unwrap();
    let mimes: Vec<&str> = req.parts.iter().map(|p| p.mime_type.as_str()).collect();
    assert_eq!(mimes, vec!["image/png", "application/pdf"]);
    assert_eq!(req.parts[0].data, "QUFB");
    assert!(!req.instruction.is_empty());
    assert!(req.response_schema["required"].as_array().unwrap().len() == 4);
}

#[tokio::test]
async fn empty_reply_moves_session_to_error() {
    for reply in [None, Some(""), Some("  \n ")] {
        let client = Arc::new(ScriptedClient::replying(reply));
        let session = session_with(&["a.png"]);
        assert!(spawn_analysis(&session, config_with(client)).unwrap().await.unwrap());

        let s = session.lock().unwrap();
        assert_eq!(s.state(), SessionState::Error);
        assert!(s.result().is_none());
        let msg = s.error().unwrap().to_lowercase();
        assert!(msg.contains("no response"), "got: {msg}");
    }
}

#[tokio::test]
async fn unparseable_reply_moves_session_to_error() {
    let client = Arc::new(ScriptedClient::replying(Some("Here are the questions you asked for")));
    let session = session_with(&["a.png"]);
    assert!(spawn_analysis(&session, config_with(client)).unwrap().await.unwrap());

    let s = session.lock().unwrap();
    assert_eq!(s.state(), SessionState::Error);
    assert!(s.error().unwrap().to_lowercase().contains("parse"));
}

#[tokio::test]
async fn schema_violation_moves_session_to_error() {
    let mut payload = valid_payload();
    payload["top15"] = json!(["just one"]);
    let client = Arc::new(ScriptedClient::replying(Some(&payload.to_string())));
    let session = session_with(&["a.png"]);
    spawn_analysis(&session, config_with(client)).unwrap().await.unwrap();

    let s = session.lock().unwrap();
    assert_eq!(s.state(), SessionState::Error);
    assert!(s.error().unwrap().contains("top15"));
}

#[tokio::test]
async fn slow_service_times_out() {
    let client = Arc::new(
        ScriptedClient::replying(Some(&valid_payload().to_string()))
            .delayed(Duration::from_secs(30)),
    );
    let config = AnalysisConfig::builder()
        .client(client)
        .api_timeout_secs(1)
        .build()
        .unwrap();
    let err = analyze(&[paper("a.png")], &config).await.unwrap_err();
    assert!(matches!(err, PyqError::ApiTimeout { secs: 1 }));
}

// ── Reset races ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_during_call_discards_late_result() {
    let gate = Arc::new(Notify::new());
    let client = Arc::new(
        ScriptedClient::replying(Some(&valid_payload().to_string())).gated(gate.clone()),
    );
    let session = session_with(&["a.png", "b.png"]);

    let handle = spawn_analysis(&session, config_with(client)).unwrap();
    session.lock().unwrap().reset();
    gate.notify_one();

    assert!(!handle.await.unwrap(), "late result must not be applied");
    let s = session.lock().unwrap();
    assert_eq!(s.state(), SessionState::Idle);
    assert!(s.result().is_none());
    assert!(s.error().is_none());
    assert!(s.files().is_empty());
}

#[tokio::test]
async fn reset_then_resubmit_only_applies_new_run() {
    let old_gate = Arc::new(Notify::new());
    let old_client = Arc::new(ScriptedClient::replying(None).gated(old_gate.clone()));
    let session = session_with(&["a.png"]);
    let old = spawn_analysis(&session, config_with(old_client)).unwrap();

    {
        let mut s = session.lock().unwrap();
        s.reset();
        s.add_file(paper("b.png")).unwrap();
    }
    let new_client = Arc::new(ScriptedClient::replying(Some(&valid_payload().to_string())));
    let new = spawn_analysis(&session, config_with(new_client)).unwrap();
    assert!(new.await.unwrap());

    old_gate.notify_one();
    assert!(!old.await.unwrap());
    assert_eq!(session.lock().unwrap().state(), SessionState::Completed);
}

#[tokio::test]
async fn submit_while_analyzing_is_rejected() {
    let gate = Arc::new(Notify::new());
    let client = Arc::new(
        ScriptedClient::replying(Some(&valid_payload().to_string())).gated(gate.clone()),
    );
    let session = session_with(&["a.png"]);
    let first = spawn_analysis(&session, config_with(client.clone())).unwrap();

    let err = spawn_analysis(&session, config_with(client)).unwrap_err();
    assert!(matches!(err, PyqError::InvalidState { .. }));

    gate.notify_one();
    assert!(first.await.unwrap());
}

// ── Preflight ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credential_fails_before_reading_files() {
    if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("API_KEY").is_ok() {
        println!("SKIP — an API key is set in the environment");
        return;
    }
    let inputs = vec!["/definitely/not/here.pdf".to_string()];
    let err = analyze_inputs(&inputs, &AnalysisConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PyqError::MissingCredential), "got: {err:?}");
    assert!(err.is_preflight());
}

#[tokio::test]
async fn empty_queue_never_reaches_client() {
    let client = Arc::new(ScriptedClient::replying(Some("{}")));
    let session: SharedSession = Arc::new(Mutex::new(Session::new()));
    let err = spawn_analysis(&session, config_with(client.clone())).unwrap_err();
    assert!(matches!(err, PyqError::NoFiles));
    assert_eq!(session.lock().unwrap().state(), SessionState::Idle);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}
