//! PDF export via pdfium.
//!
//! The layout is computed up front by [`super::layout::paginate`]; this
//! module only creates A4 pages and drops one text object per placed line.
//! pdfium calls are blocking, so async callers run [`render_pdf`] inside
//! `spawn_blocking`.
//!
//! The built-in Helvetica faces only cover WinAnsi (Latin-1 plus a few
//! typographic marks). Papers with maths symbols or non-Latin scripts need
//! a TrueType font: point `PYQ_PDF_FONT` at a `.ttf` file and it is
//! embedded and used for every line. Layout widths are still estimated
//! from the Helvetica metrics.

use super::layout::{paginate, PageGeometry, TextStyle};
use crate::error::PyqError;
use crate::output::AnalysisResult;
use chrono::{DateTime, Local};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a TrueType font to embed instead of Helvetica.
pub const FONT_ENV: &str = "PYQ_PDF_FONT";

/// Bind to the pdfium shared library.
///
/// Looks at `PDFIUM_LIB_PATH` first (a file, or a directory holding the
/// platform library), then the working directory, then the system loader.
pub fn bind_pdfium() -> Result<Pdfium, PyqError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            let path = PathBuf::from(path);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PyqError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// `PYQ_PDF_FONT`, when set to a non-empty path.
pub fn configured_font() -> Option<PathBuf> {
    std::env::var(FONT_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// Render the report to PDF bytes.
pub fn render_pdf(result: &AnalysisResult, at: &DateTime<Local>) -> Result<Vec<u8>, PyqError> {
    let pdfium = bind_pdfium()?;
    render_with(&pdfium, result, at, configured_font().as_deref())
}

/// Render with an already-bound pdfium instance.
///
/// With `font` set, that TrueType file is embedded and used for headings
/// and body alike; otherwise Helvetica and Helvetica-Bold are used.
pub fn render_with(
    pdfium: &Pdfium,
    result: &AnalysisResult,
    at: &DateTime<Local>,
    font: Option<&Path>,
) -> Result<Vec<u8>, PyqError> {
    let geometry = PageGeometry::default();
    let pages = paginate(result, &at.format("%Y-%m-%d %H:%M").to_string(), &geometry);

    let mut document = pdfium.create_new_pdf().map_err(render_err)?;
    let (regular, bold) = match font {
        Some(path) => {
            let token = document
                .fonts_mut()
                .load_true_type_from_file(path, true)
                .map_err(|e| {
                    PyqError::PdfRenderFailed(format!("font {}: {:?}", path.display(), e))
                })?;
            debug!("Embedded font {}", path.display());
            (token, token)
        }
        None => (
            document.fonts_mut().helvetica(),
            document.fonts_mut().helvetica_bold(),
        ),
    };

    for laid_out in &pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::from_points(
                PdfPoints::new(geometry.width),
                PdfPoints::new(geometry.height),
            ))
            .map_err(render_err)?;

        for line in &laid_out.lines {
            if line.text.is_empty() {
                continue;
            }
            let font = match line.style {
                TextStyle::Title | TextStyle::Heading => bold,
                TextStyle::Body | TextStyle::Subtle => regular,
            };
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(geometry.height - line.y),
                    &line.text,
                    font,
                    PdfPoints::new(geometry.size_of(line.style)),
                )
                .map_err(render_err)?;
        }
    }

    let bytes = document.save_to_bytes().map_err(render_err)?;
    debug!("Rendered PDF: {} pages, {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}

fn render_err(e: PdfiumError) -> PyqError {
    PyqError::PdfRenderFailed(format!("{:?}", e))
}
