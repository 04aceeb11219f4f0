//! Export of an [`AnalysisResult`] to PDF and plain text.
//!
//! Both targets share one intermediate form: [`blocks`] turns the
//! result into four [`ExportBlock`]s (heading + lines) with numbering and
//! markers already applied. The targets only decide how lines are placed:
//!
//! ```text
//! AnalysisResult ──▶ blocks ──┬─▶ text::render_text        (flat stream)
//!                             └─▶ layout::paginate ──▶ pdf (pages)
//! ```
//!
//! Everything up to the final PDF bytes is a pure function of the result,
//! so formatting is testable without pdfium.

pub mod layout;
pub mod pdf;
pub mod text;

use crate::error::PyqError;
use crate::output::AnalysisResult;
use chrono::{DateTime, Local};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Document title on page 1 and at the top of the text file.
pub const REPORT_TITLE: &str = "PYQ Analysis Report";

pub const HEADING_REPEATED: &str = "Repeated Questions";
pub const HEADING_IMPORTANT: &str = "Important Questions";
pub const HEADING_TOP_15: &str = "Top 15 Questions";
pub const HEADING_NOTES: &str = "Revision Notes";

/// Separator between the years of a repeated question.
pub const YEAR_SEPARATOR: &str = ", ";

/// Placeholder for a section the model left empty.
pub const EMPTY_SECTION: &str = "None identified.";

/// Export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How a line is set: numbered item, indented detail, topic or bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `N. text` — a numbered question.
    Item,
    /// Indented metadata under an item (counts, years) or a placeholder.
    Detail,
    /// A revision-note topic.
    Topic,
    /// `- text` under a topic.
    Bullet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLine {
    pub kind: LineKind,
    pub text: String,
}

impl BlockLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// One section of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlock {
    pub heading: &'static str,
    pub lines: Vec<BlockLine>,
}

/// Turn the result into the four report sections, in fixed order.
pub fn blocks(result: &AnalysisResult) -> Vec<ExportBlock> {
    let mut repeated = Vec::new();
    for (i, q) in result.repeated_questions.iter().enumerate() {
        repeated.push(BlockLine::new(LineKind::Item, format!("{}. {}", i + 1, q.question)));
        repeated.push(BlockLine::new(
            LineKind::Detail,
            format!(
                "Asked {} {} | Years: {}",
                q.count,
                if q.count == 1 { "time" } else { "times" },
                q.years.join(YEAR_SEPARATOR)
            ),
        ));
    }

    let mut notes = Vec::new();
    for note in &result.notes {
        notes.push(BlockLine::new(LineKind::Topic, note.topic.clone()));
        notes.extend(
            note.points
                .iter()
                .map(|p| BlockLine::new(LineKind::Bullet, format!("- {p}"))),
        );
    }

    vec![
        block(HEADING_REPEATED, repeated),
        block(HEADING_IMPORTANT, numbered(&result.important_questions)),
        block(HEADING_TOP_15, numbered(&result.top_15)),
        block(HEADING_NOTES, notes),
    ]
}

fn numbered(items: &[String]) -> Vec<BlockLine> {
    items
        .iter()
        .enumerate()
        .map(|(i, q)| BlockLine::new(LineKind::Item, format!("{}. {}", i + 1, q)))
        .collect()
}

fn block(heading: &'static str, mut lines: Vec<BlockLine>) -> ExportBlock {
    if lines.is_empty() {
        lines.push(BlockLine::new(LineKind::Detail, EMPTY_SECTION));
    }
    ExportBlock { heading, lines }
}

/// `pyq-analysis-<YYYY-MM-DD_HHMMSS>.<ext>`
pub fn export_filename(format: ExportFormat, at: &DateTime<Local>) -> String {
    format!(
        "pyq-analysis-{}.{}",
        at.format("%Y-%m-%d_%H%M%S"),
        format.extension()
    )
}

/// Render `result` in `format` to bytes.
pub fn render(
    result: &AnalysisResult,
    format: ExportFormat,
    at: &DateTime<Local>,
) -> Result<Vec<u8>, PyqError> {
    match format {
        ExportFormat::Text => Ok(text::render_text(result, at).into_bytes()),
        ExportFormat::Pdf => pdf::render_pdf(result, at),
    }
}

/// Render and write `result` into `dir` under a timestamped name.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// half-written report behind. Returns the final path.
pub async fn export_to_dir(
    result: &AnalysisResult,
    format: ExportFormat,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, PyqError> {
    let at = Local::now();
    let dir = dir.as_ref();
    let path = dir.join(export_filename(format, &at));

    let bytes = match format {
        ExportFormat::Text => text::render_text(result, &at).into_bytes(),
        ExportFormat::Pdf => {
            let owned = result.clone();
            tokio::task::spawn_blocking(move || pdf::render_pdf(&owned, &at))
                .await
                .map_err(|e| PyqError::Internal(format!("PDF task panicked: {e}")))??
        }
    };

    write_atomic(&path, &bytes)?;
    info!("Exported {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PyqError> {
    let io_err = |source| PyqError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
