//! Prompts and the response schema for exam-paper analysis.
//!
//! Every string the model sees lives here so prompt changes never touch the
//! request or validation code. Callers can override the system instruction
//! via [`crate::config::AnalysisConfig::system_prompt`]; the schema itself is
//! fixed because [`crate::pipeline::validate`] checks responses against it.

use serde_json::{json, Value};

/// Default system instruction sent with every analysis request.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a senior university examiner preparing revision material from previous-year question papers (PYQs).

Follow these rules precisely:

1. ONE SYLLABUS
   - Treat every attached paper and image as part of a single syllabus
   - Combine evidence across all inputs before drawing conclusions

2. NORMALISE WORDING
   - Questions that ask the same thing in different words are ONE question
   - Report each such group once, using the clearest wording

3. REPETITION AND FREQUENCY
   - Count how many times each question was asked across all inputs
   - Record the year (or paper label) of every occurrence exactly as printed

4. TONE
   - Write as a strict examiner: precise, formal, exam-focused

5. LANGUAGE
   - No informal language, slang, emojis or filler
   - Do not address the student directly"#;

/// Instruction appended after the file parts in the user turn.
pub const ANALYSIS_INSTRUCTION: &str = "Analyse the attached previous-year question papers. \
Identify repeated questions with their occurrence counts and years, list the important \
questions, select exactly 15 top questions most likely to be asked, and write concise \
revision notes grouped by topic.";

/// Header placed before the schema when the provider cannot enforce it natively.
pub const SCHEMA_PREAMBLE: &str = "Respond with a single JSON object and nothing else. \
It must match this JSON schema exactly (all properties required):";

/// The response schema declared to the service.
///
/// Uses the OpenAPI subset understood by the Gemini `responseSchema` field
/// (upper-case type names). Four required top-level properties; every nested
/// array and object is fully typed.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "repeatedQuestions": {
                "type": "ARRAY",
                "description": "Questions asked more than once across the papers.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "questionText": { "type": "STRING" },
                        "occurrenceCount": { "type": "INTEGER" },
                        "years": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["questionText", "occurrenceCount", "years"]
                }
            },
            "importantQuestions": {
                "type": "ARRAY",
                "description": "High-value questions for revision.",
                "items": { "type": "STRING" }
            },
            "top15": {
                "type": "ARRAY",
                "description": "Exactly 15 questions most likely to appear in the next exam.",
                "items": { "type": "STRING" }
            },
            "notes": {
                "type": "ARRAY",
                "description": "Revision notes grouped by topic.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "topic": { "type": "STRING" },
                        "bulletPoints": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["topic", "bulletPoints"]
                }
            }
        },
        "required": ["repeatedQuestions", "importantQuestions", "top15", "notes"]
    })
}

/// System instruction with the schema spelled out, for providers that only
/// take free text.
pub fn system_instruction_with_schema(system_prompt: &str) -> String {
    let schema = serde_json::to_string_pretty(&response_schema()).unwrap_or_default();
    format!("{system_prompt}\n\n{SCHEMA_PREAMBLE}\n{schema}")
}
