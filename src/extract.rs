//! Best-effort extraction of a JSON object from free-form model output
//!
//! Models wrap JSON in prose, markdown fences, or both. Extraction never
//! errors; a hopeless input yields `None` and the caller continues with an
//! empty report.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Extract the first well-formed JSON object from `text`.
///
/// Attempts, in order: parse the whole (trimmed) text, parse the contents
/// of a fenced code block, scan for the first balanced `{...}` object.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    first_object(trimmed)
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap())
}

/// Contents of the first ``` fenced block, if any
fn fenced_block(text: &str) -> Option<&str> {
    fence_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Scan for the first balanced top-level `{...}` and parse it.
///
/// Tracks string literals and escapes so braces inside strings don't
/// unbalance the count.
fn first_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + 1];
                    return serde_json::from_str::<Value>(candidate)
                        .ok()
                        .filter(Value::is_object);
                }
            }
            _ => {}
        }
    }

    None
}
