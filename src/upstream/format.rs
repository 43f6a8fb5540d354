//! Reshaping upstream payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s+").expect("valid regex"));

pub const NO_ANSWER: &str = "No answer available.";

/// Start a new paragraph after every sentence.
pub fn format_paragraphs(text: &str) -> String {
    SENTENCE_END.replace_all(text, ".\n\n").into_owned()
}

/// Pick the part of an upstream body a route exposes.
///
/// `pointer` is a JSON pointer; an empty or absent pointer selects the whole body.
/// When `paragraphs` is set the selection must be a string, otherwise the
/// [`NO_ANSWER`] placeholder is returned.
pub fn shape(body: Value, pointer: Option<&str>, paragraphs: bool) -> Value {
    let selected = match pointer {
        Some(p) if !p.is_empty() => body.pointer(p).cloned().unwrap_or(Value::Null),
        _ => body,
    };

    if !paragraphs {
        return selected;
    }

    match selected.as_str() {
        Some(text) if !text.is_empty() => Value::String(format_paragraphs(text)),
        _ => Value::String(NO_ANSWER.to_string()),
    }
}
