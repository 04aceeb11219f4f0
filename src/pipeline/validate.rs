//! Response validation: raw text → [`AnalysisResult`], or a contract error.
//!
//! The response is never trusted as-is. After JSON parsing, the value is
//! walked against the declared schema and every mismatch is reported with
//! its path (`repeatedQuestions[2].years[0]: expected a string`), which
//! makes model drift easy to spot in logs.
//!
//! Two cleanups run before parsing, both for free-text providers that
//! ignore "JSON only" instructions: an outer ```` ```json ```` fence is
//! stripped, and a BOM is dropped. String values are trimmed.

use crate::error::PyqError;
use crate::output::{AnalysisResult, RepeatedQuestion, RevisionNote, TOP_QUESTION_COUNT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*)\n```\s*$").unwrap());

/// Parse and validate the raw response text.
///
/// # Errors
/// * [`PyqError::NoResponse`] — `None`, empty, or whitespace-only text
/// * [`PyqError::MalformedJson`] — text is not JSON
/// * [`PyqError::SchemaViolation`] — JSON does not match the schema,
///   including a `top15` list that does not hold exactly 15 entries
pub fn parse_response(text: Option<&str>) -> Result<AnalysisResult, PyqError> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(PyqError::NoResponse);
    }
    let body = strip_json_fences(text.trim_start_matches('\u{FEFF}'));
    let value: Value =
        serde_json::from_str(body).map_err(|source| PyqError::MalformedJson { source })?;
    validate_value(&value)
}

fn strip_json_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input) {
        Some(caps) => caps.get(1).map_or(input, |m| m.as_str()),
        None => input,
    }
}

/// Check a parsed value against the schema and build the result.
pub fn validate_value(value: &Value) -> Result<AnalysisResult, PyqError> {
    let root = value
        .as_object()
        .ok_or_else(|| violation("$", "expected an object"))?;

    let repeated_questions = required_array(root, "repeatedQuestions")?
        .iter()
        .enumerate()
        .map(|(i, item)| repeated_question(item, &format!("repeatedQuestions[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    let important_questions = string_array(
        required_array(root, "importantQuestions")?,
        "importantQuestions",
    )?;

    let top_15 = string_array(required_array(root, "top15")?, "top15")?;
    if top_15.len() != TOP_QUESTION_COUNT {
        return Err(violation(
            "top15",
            &format!(
                "expected exactly {} entries, got {}",
                TOP_QUESTION_COUNT,
                top_15.len()
            ),
        ));
    }

    let notes = required_array(root, "notes")?
        .iter()
        .enumerate()
        .map(|(i, item)| revision_note(item, &format!("notes[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult {
        repeated_questions,
        important_questions,
        top_15,
        notes,
    })
}

fn repeated_question(item: &Value, path: &str) -> Result<RepeatedQuestion, PyqError> {
    let obj = item
        .as_object()
        .ok_or_else(|| violation(path, "expected an object"))?;
    let question = required_string(obj, "questionText", path)?;
    let count_path = format!("{path}.occurrenceCount");
    let count = obj
        .get("occurrenceCount")
        .ok_or_else(|| violation(&count_path, "missing"))?;
    let count = as_count(count)
        .filter(|&n| n >= 1)
        .ok_or_else(|| violation(&count_path, "expected a positive integer"))?;
    let years_path = format!("{path}.years");
    let years = obj
        .get("years")
        .and_then(Value::as_array)
        .ok_or_else(|| violation(&years_path, "expected an array"))?;
    let years = years
        .iter()
        .enumerate()
        .map(|(i, y)| {
            year_label(y)
                .ok_or_else(|| violation(&format!("{years_path}[{i}]"), "expected a string"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RepeatedQuestion {
        question,
        count,
        years,
    })
}

fn revision_note(item: &Value, path: &str) -> Result<RevisionNote, PyqError> {
    let obj = item
        .as_object()
        .ok_or_else(|| violation(path, "expected an object"))?;
    let topic = required_string(obj, "topic", path)?;
    let points_path = format!("{path}.bulletPoints");
    let points = obj
        .get("bulletPoints")
        .and_then(Value::as_array)
        .ok_or_else(|| violation(&points_path, "expected an array"))?;
    Ok(RevisionNote {
        topic,
        points: string_array(points, &points_path)?,
    })
}

fn required_array<'a>(root: &'a Map<String, Value>, key: &str) -> Result<&'a Vec<Value>, PyqError> {
    match root.get(key) {
        None => Err(violation(key, "missing required property")),
        Some(v) => v.as_array().ok_or_else(|| violation(key, "expected an array")),
    }
}

fn required_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, PyqError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| violation(&format!("{path}.{key}"), "expected a string"))
}

fn string_array(items: &[Value], path: &str) -> Result<Vec<String>, PyqError> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| violation(&format!("{path}[{i}]"), "expected a string"))
        })
        .collect()
}

/// Integers, and floats with no fractional part (`3.0`), are accepted.
fn as_count(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = v.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

/// Years are strings on the wire; bare integers (`2021`) are kept verbatim.
fn year_label(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn violation(path: &str, detail: &str) -> PyqError {
    PyqError::SchemaViolation {
        detail: format!("{path}: {detail}"),
    }
}
