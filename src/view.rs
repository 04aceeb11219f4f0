//! Terminal rendering of an [`AnalysisResult`].
//!
//! The result is shown as four tabs, one section each. A tab bar marks the
//! active tab; [`Renderer::render_tab`] prints one section and
//! [`Renderer::render_all`] prints all four. Section text comes from the
//! same blocks as the exports, so the terminal and the files never disagree.

use crate::error::PyqError;
use crate::export::{self, LineKind};
use crate::output::AnalysisResult;
use crate::session::{Session, SessionState};
use crate::theme::{Palette, Theme};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    #[default]
    Repeated,
    Important,
    Top15,
    Notes,
}

impl ResultTab {
    pub const ALL: [ResultTab; 4] = [
        ResultTab::Repeated,
        ResultTab::Important,
        ResultTab::Top15,
        ResultTab::Notes,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ResultTab::Repeated => export::HEADING_REPEATED,
            ResultTab::Important => export::HEADING_IMPORTANT,
            ResultTab::Top15 => export::HEADING_TOP_15,
            ResultTab::Notes => export::HEADING_NOTES,
        }
    }

    fn index(self) -> usize {
        match self {
            ResultTab::Repeated => 0,
            ResultTab::Important => 1,
            ResultTab::Top15 => 2,
            ResultTab::Notes => 3,
        }
    }

    /// Next tab, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ResultTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultTab::Repeated => "repeated",
            ResultTab::Important => "important",
            ResultTab::Top15 => "top15",
            ResultTab::Notes => "notes",
        })
    }
}

impl FromStr for ResultTab {
    type Err = PyqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repeated" => Ok(ResultTab::Repeated),
            "important" => Ok(ResultTab::Important),
            "top15" | "top" => Ok(ResultTab::Top15),
            "notes" => Ok(ResultTab::Notes),
            other => Err(PyqError::InvalidConfig(format!(
                "Unknown section '{other}' (expected repeated, important, top15 or notes)"
            ))),
        }
    }
}

/// Formats results for the terminal, optionally in colour.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    palette: Option<&'static Palette>,
}

impl Renderer {
    pub fn new(theme: Theme, color: bool) -> Self {
        Self {
            palette: color.then(|| theme.palette()),
        }
    }

    /// No escape codes at all.
    pub fn plain() -> Self {
        Self { palette: None }
    }

    fn paint(&self, pick: fn(&Palette) -> &'static str, s: &str) -> String {
        match self.palette {
            Some(p) => Palette::paint(pick(p), s),
            None => s.to_string(),
        }
    }

    /// `[ Repeated Questions ]  Important Questions  ...`
    pub fn tab_bar(&self, active: ResultTab) -> String {
        ResultTab::ALL
            .iter()
            .map(|&tab| {
                if tab == active {
                    self.paint(|p| p.active_tab, &format!("[ {} ]", tab.title()))
                } else {
                    self.paint(|p| p.inactive_tab, &format!("  {}  ", tab.title()))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tab bar followed by the body of `tab`.
    pub fn render_tab(&self, result: &AnalysisResult, tab: ResultTab) -> String {
        let mut out = self.tab_bar(tab);
        out.push_str("\n\n");
        out.push_str(&self.section(result, tab));
        out
    }

    /// All four sections, one after the other.
    pub fn render_all(&self, result: &AnalysisResult) -> String {
        ResultTab::ALL
            .iter()
            .map(|&tab| {
                format!(
                    "{}\n{}",
                    self.paint(|p| p.heading, tab.title()),
                    self.section(result, tab)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn section(&self, result: &AnalysisResult, tab: ResultTab) -> String {
        let blocks = export::blocks(result);
        let mut out = String::new();
        if let Some(block) = blocks.get(tab.index()) {
            for line in &block.lines {
                let text = match line.kind {
                    LineKind::Item => line.text.clone(),
                    LineKind::Detail => format!("   {}", self.paint(|p| p.muted, &line.text)),
                    LineKind::Topic => self.paint(|p| p.accent, &line.text),
                    LineKind::Bullet => format!("  {}", line.text),
                };
                out.push_str(&text);
                out.push('\n');
            }
        }
        out
    }

    /// One-line summary of where the session is.
    pub fn status(&self, session: &Session) -> String {
        match session.state() {
            SessionState::Idle => format!("{} file(s) queued", session.files().len()),
            SessionState::Analyzing => "Analysing question papers…".to_string(),
            SessionState::Completed => session
                .result()
                .map(|r| {
                    format!(
                        "Analysis complete: {} repeated, {} important, {} top, {} notes",
                        r.repeated_questions.len(),
                        r.important_questions.len(),
                        r.top_15.len(),
                        r.notes.len()
                    )
                })
                .unwrap_or_default(),
            SessionState::Error => self.paint(
                |p| p.error,
                &format!("Error: {}", session.error().unwrap_or("unknown error")),
            ),
        }
    }
}
