//! Lenient JSON object recovery for model output.
//!
//! Strict decode first. When that fails, scan for the first balanced
//! `{...}` span and decode that substring only. Nothing beyond that one
//! bounded recovery step is attempted; malformed output stays malformed.

use serde_json::Value;

/// Recover a JSON object from raw model output.
///
/// Returns `None` when neither the whole text nor its first balanced
/// object span decodes to a JSON object.
pub fn recover_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let span = first_object_span(trimmed)?;
    match serde_json::from_str::<Value>(span) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Coerce a boolean-like JSON value to a boolean.
///
/// Accepts real booleans, numbers (non-zero is true), and the common
/// yes/no token spellings models produce; anything else takes `default`.
pub fn coerce_bool(value: &Value, default: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "detected" | "present" => true,
            "false" | "no" | "n" | "0" | "not_detected" | "absent" => false,
            _ => default,
        },
        _ => default,
    }
}

/// The first `{...}` span with balanced braces, honoring string literals
/// and escapes so braces inside strings do not end the span.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
