//! Result types produced by an analysis run.
//!
//! Field names follow the wire schema declared in [`crate::prompts`]
//! (camelCase), so a result serialised with `--json` can be fed straight
//! back into [`crate::pipeline::validate::parse_response`].

use serde::{Deserialize, Serialize};

/// Number of entries the `top15` list must contain.
pub const TOP_QUESTION_COUNT: usize = 15;

/// A question that appears in more than one paper (or more than once).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedQuestion {
    /// Normalised wording chosen by the model for all near-duplicates.
    #[serde(rename = "questionText")]
    pub question: String,
    /// How many times the question was asked across all inputs.
    #[serde(rename = "occurrenceCount")]
    pub count: u32,
    /// Years (or paper labels) it was asked in, verbatim from the model.
    pub years: Vec<String>,
}

/// A revision note for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionNote {
    pub topic: String,
    #[serde(rename = "bulletPoints")]
    pub points: Vec<String>,
}

/// The complete, validated answer of one analysis call.
///
/// Produced atomically; never patched after the fact. A new run replaces
/// it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "repeatedQuestions")]
    pub repeated_questions: Vec<RepeatedQuestion>,
    #[serde(rename = "importantQuestions")]
    pub important_questions: Vec<String>,
    /// Exactly [`TOP_QUESTION_COUNT`] entries once validated.
    #[serde(rename = "top15")]
    pub top_15: Vec<String>,
    pub notes: Vec<RevisionNote>,
}

impl AnalysisResult {
    /// Total number of entries across all four sections.
    pub fn entry_count(&self) -> usize {
        self.repeated_questions.len()
            + self.important_questions.len()
            + self.top_15.len()
            + self.notes.len()
    }
}

/// Timing and size figures for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Number of files sent in the request.
    pub files: usize,
    /// Sum of the decoded file sizes.
    pub input_bytes: u64,
    /// Length of the raw response text.
    pub response_chars: usize,
    /// Wall-clock time of the external call.
    pub llm_duration_ms: u64,
    /// Wall-clock time of the whole run, validation included.
    pub total_duration_ms: u64,
    /// Model that answered, as reported by the client.
    pub model: String,
}

/// What [`crate::analyze::analyze`] returns on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub result: AnalysisResult,
    pub stats: AnalysisStats,
}
