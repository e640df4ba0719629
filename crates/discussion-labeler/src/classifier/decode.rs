//! Decoding of raw classifier output into tag names.
//!
//! [`decode_tags`] first tries a strict JSON decode. Only when that fails
//! does it fall back to [`recover_tags`], which scrapes the outermost
//! bracketed array out of the text; such results are tagged
//! [`DecodeSource::Recovered`].

use serde_json::Value;

use super::{Classification, ClassificationError};

/// Which decoder produced the tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeSource {
    Strict,
    Recovered,
}

/// Decode `raw` model output.
///
/// Accepts a bare JSON array or an object with a `tags` array, optionally
/// wrapped in a markdown code fence. Non-string items are stringified.
pub fn decode_tags(raw: &str) -> Result<Classification, ClassificationError> {
    let text = raw.trim();
    if text.is_empty() || text == "None" || text == "null" {
        return Err(ClassificationError::EmptyOutput);
    }

    match serde_json::from_str::<Value>(strip_code_fence(text)) {
        Ok(parsed) => tags_from_value(parsed).map(|tags| Classification {
            tags,
            source: DecodeSource::Strict,
        }),
        Err(strict) => recover_tags(text)
            .map(|tags| Classification {
                tags,
                source: DecodeSource::Recovered,
            })
            .ok_or_else(|| ClassificationError::Unparsable(format!("{strict}: {text}"))),
    }
}

/// Parse the substring from the first `[` to the last `]` as an array.
#[must_use]
pub fn recover_tags(raw: &str) -> Option<Vec<String>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Array(items)) => Some(items.into_iter().map(stringify).collect()),
        _ => None,
    }
}

// Sometimes the model wraps JSON in markdown code blocks
fn strip_code_fence(text: &str) -> &str {
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(rest) => rest.strip_suffix("```").unwrap_or(rest).trim(),
        None => text,
    }
}

fn tags_from_value(parsed: Value) -> Result<Vec<String>, ClassificationError> {
    match parsed {
        Value::Array(items) => Ok(items.into_iter().map(stringify).collect()),
        Value::Object(mut map) => match map.remove("tags") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.into_iter().map(stringify).collect()),
            Some(other) => Err(ClassificationError::Unparsable(format!(
                "\"tags\" is not a list: {other}"
            ))),
        },
        other => Err(ClassificationError::Unparsable(format!(
            "unexpected output format: {other}"
        ))),
    }
}

fn stringify(item: Value) -> String {
    match item {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
