//! Page layout for the PDF export.
//!
//! Pure: blocks in, pages of positioned lines out. Lines are wrapped to a
//! character width derived from the page width and font size, and a vertical
//! cursor decides page breaks. A heading is never left alone at the bottom of
//! a page: it moves to the next page together with its first body line.
//!
//! `y` is measured from the **top** of the page to the baseline; the PDF
//! renderer flips it into PDF's bottom-up space.

use super::{blocks, ExportBlock, LineKind, REPORT_TITLE};
use crate::output::AnalysisResult;

/// Font weight and size of a placed line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextStyle {
    Title,
    Heading,
    Body,
    Subtle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaidOutPage {
    pub lines: Vec<PlacedLine>,
}

/// Page geometry in PDF points. Defaults to A4 portrait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub title_size: f32,
    pub heading_size: f32,
    pub body_size: f32,
    /// Line height as a multiple of the font size.
    pub leading: f32,
    /// Left indent of detail lines and bullets.
    pub indent: f32,
    /// Average glyph advance as a fraction of the font size. English text in
    /// Helvetica runs at 0.52-0.55, so the default sits at the top of that.
    pub glyph_width: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 50.0,
            title_size: 20.0,
            heading_size: 15.0,
            body_size: 11.0,
            leading: 1.4,
            indent: 18.0,
            glyph_width: 0.55,
        }
    }
}

impl PageGeometry {
    pub fn size_of(&self, style: TextStyle) -> f32 {
        match style {
            TextStyle::Title => self.title_size,
            TextStyle::Heading => self.heading_size,
            TextStyle::Body | TextStyle::Subtle => self.body_size,
        }
    }

    fn line_height(&self, style: TextStyle) -> f32 {
        self.size_of(style) * self.leading
    }

    /// How many characters fit on one line at `style`, starting at `indent`.
    pub fn chars_per_line(&self, style: TextStyle, indent: f32) -> usize {
        let usable = self.width - 2.0 * self.margin - indent;
        let advance = self.size_of(style) * self.glyph_width;
        ((usable / advance).floor() as usize).max(1)
    }

    fn bottom(&self) -> f32 {
        self.height - self.margin
    }
}

/// Lay out `result` as a paginated report.
pub fn paginate(result: &AnalysisResult, date: &str, geometry: &PageGeometry) -> Vec<LaidOutPage> {
    let mut cursor = Cursor::new(*geometry);
    cursor.place(REPORT_TITLE, 0.0, TextStyle::Title);
    cursor.place(&format!("Generated: {date}"), 0.0, TextStyle::Subtle);

    for block in blocks(result) {
        place_block(&mut cursor, &block);
    }
    cursor.finish()
}

fn place_block(cursor: &mut Cursor, block: &ExportBlock) {
    let g = cursor.geometry;
    cursor.skip(g.body_size);

    // Keep the heading with the first wrapped body line.
    let first_body_height = block
        .lines
        .first()
        .map_or(0.0, |l| g.line_height(style_of(l.kind)));
    if !cursor.fits(g.line_height(TextStyle::Heading) + first_body_height) {
        cursor.new_page();
    }
    cursor.place(block.heading, 0.0, TextStyle::Heading);

    for line in &block.lines {
        let (indent, style) = (indent_of(line.kind, &g), style_of(line.kind));
        for segment in wrap(&line.text, g.chars_per_line(style, indent)) {
            cursor.place(&segment, indent, style);
        }
    }
}

fn style_of(kind: LineKind) -> TextStyle {
    match kind {
        LineKind::Detail => TextStyle::Subtle,
        _ => TextStyle::Body,
    }
}

fn indent_of(kind: LineKind, g: &PageGeometry) -> f32 {
    match kind {
        LineKind::Item | LineKind::Topic => 0.0,
        LineKind::Detail | LineKind::Bullet => g.indent,
    }
}

struct Cursor {
    geometry: PageGeometry,
    pages: Vec<LaidOutPage>,
    current: LaidOutPage,
    y: f32,
}

impl Cursor {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: LaidOutPage::default(),
            y: geometry.margin,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.y + height <= self.geometry.bottom()
    }

    fn skip(&mut self, height: f32) {
        if self.fits(height) {
            self.y += height;
        }
    }

    fn new_page(&mut self) {
        let done = std::mem::take(&mut self.current);
        self.pages.push(done);
        self.y = self.geometry.margin;
    }

    fn place(&mut self, text: &str, indent: f32, style: TextStyle) {
        let height = self.geometry.line_height(style);
        if !self.fits(height) && !self.current.lines.is_empty() {
            self.new_page();
        }
        self.y += height;
        self.current.lines.push(PlacedLine {
            text: text.to_string(),
            x: self.geometry.margin + indent,
            y: self.y,
            style,
        });
    }

    fn finish(mut self) -> Vec<LaidOutPage> {
        if !self.current.lines.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Greedy word wrap to `width` columns. Words longer than a line are
/// split hard. Always yields at least one line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let options = textwrap::Options::new(width.max(1))
        .break_words(true)
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    let lines: Vec<String> = textwrap::wrap(text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{HEADING_IMPORTANT, HEADING_NOTES, HEADING_REPEATED, HEADING_TOP_15};
    use crate::output::{RepeatedQuestion, RevisionNote};

    fn small() -> AnalysisResult {
        AnalysisResult {
            repeated_questions: vec![RepeatedQuestion {
                question: "Explain Ohm's law.".into(),
                count: 2,
                years: vec!["2019".into(), "2021".into()],
            }],
            important_questions: vec!["State Gauss's law.".into()],
            top_15: (1..=15).map(|i| format!("Q{i}")).collect(),
            notes: vec![RevisionNote {
                topic: "Circuits".into(),
                points: vec!["V = IR".into()],
            }],
        }
    }

    fn long() -> AnalysisResult {
        let sentence = "Derive an expression for the electric field due to a uniformly charged \
                        infinite plane sheet and discuss its dependence on distance";
        AnalysisResult {
            repeated_questions: (0..40)
                .map(|i| RepeatedQuestion {
                    question: format!("{sentence} (variant {i})"),
                    count: 3,
                    years: vec!["2018".into(), "2020".into(), "2022".into()],
                })
                .collect(),
            important_questions: (0..30).map(|i| format!("{sentence} {i}")).collect(),
            top_15: (1..=15).map(|i| format!("{sentence} {i}")).collect(),
            notes: (0..10)
                .map(|i| RevisionNote {
                    topic: format!("Topic {i}"),
                    points: vec![sentence.to_string(); 4],
                })
                .collect(),
        }
    }

    fn all_lines(pages: &[LaidOutPage]) -> Vec<&PlacedLine> {
        pages.iter().flat_map(|p| p.lines.iter()).collect()
    }

    #[test]
    fn small_result_fits_one_page() {
        let pages = paginate(&small(), "2026-10-18", &PageGeometry::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines[0].text, REPORT_TITLE);
        assert_eq!(pages[0].lines[0].style, TextStyle::Title);
    }

    #[test]
    fn long_result_spans_pages_and_stays_in_bounds() {
        let g = PageGeometry::default();
        let pages = paginate(&long(), "2026-10-18", &g);
        assert!(pages.len() > 3, "got {} pages", pages.len());
        for page in &pages {
            assert!(!page.lines.is_empty());
            for line in &page.lines {
                assert!(line.y > g.margin && line.y <= g.height - g.margin, "y = {}", line.y);
            }
        }
    }

    #[test]
    fn every_heading_is_placed() {
        let pages = paginate(&long(), "2026-10-18", &PageGeometry::default());
        for heading in [HEADING_REPEATED, HEADING_IMPORTANT, HEADING_TOP_15, HEADING_NOTES] {
            assert!(
                all_lines(&pages)
                    .iter()
                    .any(|l| l.text == heading && l.style == TextStyle::Heading),
                "missing {heading}"
            );
        }
    }

    #[test]
    fn heading_never_last_on_page() {
        let pages = paginate(&long(), "2026-10-18", &PageGeometry::default());
        for page in &pages {
            let last = page.lines.last().unwrap();
            assert_ne!(last.style, TextStyle::Heading, "orphan heading '{}'", last.text);
        }
    }

    #[test]
    fn wrapped_lines_respect_width() {
        let g = PageGeometry::default();
        let pages = paginate(&long(), "2026-10-18", &g);
        let max = g.chars_per_line(TextStyle::Body, 0.0);
        assert!(all_lines(&pages).iter().all(|l| l.text.chars().count() <= max));
    }

    #[test]
    fn default_body_line_holds_81_chars() {
        let g = PageGeometry::default();
        assert_eq!(g.chars_per_line(TextStyle::Body, 0.0), 81);
        assert_eq!(g.chars_per_line(TextStyle::Body, g.indent), 78);
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("x abcdef", 4), vec!["x", "abcd", "ef"]);
    }

    #[test]
    fn wrap_never_returns_no_lines() {
        assert_eq!(wrap("   ", 10).len(), 1);
        assert_eq!(wrap("word", 0), vec!["w", "o", "r", "d"]);
    }
}
