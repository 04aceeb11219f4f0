//! Session controller: the Idle → Analyzing → Completed | Error machine.
//!
//! A [`Session`] owns everything one user interaction needs: the queued
//! files, the current result or error message, and a generation counter.
//! [`Session::submit`] hands out an [`AnalysisTicket`] stamped with the
//! current generation; [`Session::complete`] only applies an outcome whose
//! ticket is still current. [`Session::reset`] bumps the generation, so a
//! call that was in flight when the user reset resolves into a no-op
//! instead of overwriting the fresh session.
//!
//! ```text
//!          submit             success
//!   Idle ──────────▶ Analyzing ───────▶ Completed
//!    ▲                  │
//!    │                  │ failure
//!    │                  ▼
//!    └──── reset ───── Error        (reset from any state → Idle)
//! ```

use crate::analyze::analyze;
use crate::config::AnalysisConfig;
use crate::error::PyqError;
use crate::output::AnalysisResult;
use crate::pipeline::intake::{FileQueue, UploadedFile};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which view the session is in. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    #[default]
    Idle,
    Analyzing,
    Completed,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Analyzing => "analyzing",
            SessionState::Completed => "completed",
            SessionState::Error => "in error",
        };
        f.write_str(s)
    }
}

/// Proof of a submission: the generation it belongs to and a snapshot of
/// the files that were submitted.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    generation: u64,
    files: Vec<UploadedFile>,
}

impl AnalysisTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }
}

/// State container for one user session.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    files: FileQueue,
    result: Option<AnalysisResult>,
    error: Option<String>,
    generation: u64,
}

/// A session shared between the UI and a spawned analysis task.
pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn files(&self) -> &[UploadedFile] {
        self.files.as_slice()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue another file. Idle only.
    pub fn add_file(&mut self, file: UploadedFile) -> Result<(), PyqError> {
        self.require_idle("add files")?;
        debug!("Queued '{}' ({})", file.name(), file.mime_type());
        self.files.push(file);
        Ok(())
    }

    /// Drop the file at `index`, keeping the order of the others. Idle only.
    pub fn remove_file(&mut self, index: usize) -> Result<UploadedFile, PyqError> {
        self.require_idle("remove files")?;
        let removed = self.files.remove(index)?;
        debug!("Removed '{}' from the queue", removed.name());
        Ok(removed)
    }

    /// Whether `submit` would currently succeed.
    pub fn can_submit(&self) -> bool {
        self.state == SessionState::Idle && !self.files.is_empty()
    }

    /// Move to Analyzing and return the ticket for the call.
    pub fn submit(&mut self) -> Result<AnalysisTicket, PyqError> {
        self.require_idle("submit")?;
        if self.files.is_empty() {
            return Err(PyqError::NoFiles);
        }
        self.generation += 1;
        self.state = SessionState::Analyzing;
        self.result = None;
        self.error = None;
        info!(
            "Submitted {} files (generation {})",
            self.files.len(),
            self.generation
        );
        Ok(AnalysisTicket {
            generation: self.generation,
            files: self.files.as_slice().to_vec(),
        })
    }

    /// Apply the outcome of the call behind `ticket`.
    ///
    /// Returns `false`, leaving the session untouched, when the ticket is
    /// stale (a reset happened since) or the session is not analysing.
    pub fn complete(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<AnalysisResult, PyqError>,
    ) -> bool {
        if ticket.generation != self.generation || self.state != SessionState::Analyzing {
            warn!(
                "Ignoring stale analysis outcome (ticket {}, current {}, state {})",
                ticket.generation, self.generation, self.state
            );
            return false;
        }
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.state = SessionState::Completed;
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                self.error = Some(e.to_string());
                self.state = SessionState::Error;
            }
        }
        true
    }

    /// Back to Idle from any state; drops files, result and error, and
    /// invalidates any outstanding ticket.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Idle;
        self.files.clear();
        self.result = None;
        self.error = None;
        debug!("Session reset (generation {})", self.generation);
    }

    fn require_idle(&self, action: &'static str) -> Result<(), PyqError> {
        if self.state == SessionState::Idle {
            Ok(())
        } else {
            Err(PyqError::InvalidState {
                action,
                state: self.state.to_string(),
            })
        }
    }
}

/// Submit `session` and run the analysis on a tokio task.
///
/// The returned handle resolves to whether the outcome was applied; it is
/// `false` when the session was reset while the call was in flight. The
/// mutex is only held for the synchronous submit and complete steps.
pub fn spawn_analysis(
    session: &SharedSession,
    config: AnalysisConfig,
) -> Result<JoinHandle<bool>, PyqError> {
    let ticket = session
        .lock()
        .map_err(|_| PyqError::Internal("session lock poisoned".into()))?
        .submit()?;
    let session = Arc::clone(session);

    Ok(tokio::spawn(async move {
        let outcome = analyze(ticket.files(), &config).await.map(|out| out.result);
        match session.lock() {
            Ok(mut s) => s.complete(ticket, outcome),
            Err(_) => false,
        }
    }))
}
