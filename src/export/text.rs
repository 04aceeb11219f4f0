//! Plain-text export: the blocks as a flat stream, one line per entry.

use super::{blocks, LineKind, REPORT_TITLE};
use crate::output::AnalysisResult;
use chrono::{DateTime, Local};

const DETAIL_INDENT: &str = "   ";
const BULLET_INDENT: &str = "  ";

/// Render the report as UTF-8 text.
///
/// Headings are underlined with `=`; sections are separated by one blank
/// line. The output always ends with a single newline.
pub fn render_text(result: &AnalysisResult, at: &DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(REPORT_TITLE);
    out.push('\n');
    out.push_str(&format!("Generated: {}\n", at.format("%Y-%m-%d %H:%M")));

    for block in blocks(result) {
        out.push('\n');
        out.push_str(block.heading);
        out.push('\n');
        out.push_str(&"=".repeat(block.heading.chars().count()));
        out.push('\n');
        for line in &block.lines {
            let indent = match line.kind {
                LineKind::Item | LineKind::Topic => "",
                LineKind::Detail => DETAIL_INDENT,
                LineKind::Bullet => BULLET_INDENT,
            };
            out.push_str(indent);
            out.push_str(&line.text);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{HEADING_IMPORTANT, HEADING_NOTES, HEADING_REPEATED, HEADING_TOP_15};
    use crate::output::{RepeatedQuestion, RevisionNote};
    use chrono::TimeZone;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            repeated_questions: vec![
                RepeatedQuestion {
                    question: "Explain Ohm's law.".into(),
                    count: 3,
                    years: vec!["2019".into(), "2021".into(), "2023".into()],
                },
                RepeatedQuestion {
                    question: "Define electric potential.".into(),
                    count: 2,
                    years: vec!["2020".into(), "2022".into()],
                },
            ],
            important_questions: vec![
                "Derive the lens formula.".into(),
                "State Gauss's law.".into(),
                "Explain total internal reflection.".into(),
            ],
            top_15: (1..=15).map(|i| format!("Top question {i}")).collect(),
            notes: vec![RevisionNote {
                topic: "Current Electricity".into(),
                points: vec!["V = IR".into(), "Series resistances add".into()],
            }],
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 14, 3, 0).unwrap()
    }

    #[test]
    fn sections_appear_in_order() {
        let text = render_text(&sample(), &at());
        let headings = [HEADING_REPEATED, HEADING_IMPORTANT, HEADING_TOP_15, HEADING_NOTES];
        let positions: Vec<usize> = headings.iter().map(|h| text.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_entry_rendered() {
        let text = render_text(&sample(), &at());
        assert!(text.contains("1. Explain Ohm's law.\n   Asked 3 times | Years: 2019, 2021, 2023\n"));
        assert!(text.contains("2. Define electric potential.\n   Asked 2 times | Years: 2020, 2022\n"));
        assert!(text.contains("3. Explain total internal reflection."));
        for i in 1..=15 {
            assert!(text.contains(&format!("{i}. Top question {i}\n")));
        }
        assert!(text.contains("Current Electricity\n  - V = IR\n  - Series resistances add\n"));
    }

    #[test]
    fn header_and_underline() {
        let text = render_text(&sample(), &at());
        assert!(text.starts_with("PYQ Analysis Report\nGenerated: 2026-10-18 14:03\n"));
        assert!(text.contains("Top 15 Questions\n================\n"));
        assert!(text.ends_with("Series resistances add\n"));
    }

    #[test]
    fn empty_sections_get_placeholder() {
        let mut result = sample();
        result.repeated_questions.clear();
        let text = render_text(&result, &at());
        assert!(text.contains("Repeated Questions\n==================\n   None identified.\n"));
    }
}
