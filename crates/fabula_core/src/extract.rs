//! Extraction of structured data from unreliable model text output.
//!
//! Models asked for JSON routinely wrap it in markdown fences, surround it
//! with prose, or leave a trailing comma before a closer. The extractor
//! peels those layers off in a fixed order and only then parses.

use fabula_error::JsonError;
use serde::de::DeserializeOwned;

/// Parse possibly-malformed model output into a typed value.
///
/// Applied in order: trim, prefer fenced code block content, truncate to the
/// first `{`/`[` and the last matching closer, strict parse, then a repaired
/// parse with trailing commas removed. Pure function; every failure mode
/// reports through the returned error, never a panic.
///
/// # Examples
///
/// ```
/// use fabula_core::extract_json;
///
/// let wrapped = "Here you go:\n```json\n{\"title\": \"The Fox\"}\n```";
/// let value: serde_json::Value = extract_json(wrapped).unwrap();
/// assert_eq!(value["title"], "The Fox");
/// ```
///
/// # Errors
///
/// Returns a [`JsonError`] whose message carries the original raw text when
/// no parse attempt succeeds.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, JsonError> {
    let mut text = raw.trim();

    if let Some(inner) = fenced_block(text) {
        text = inner;
    }

    let text = truncate_to_span(text);

    if let Ok(value) = serde_json::from_str::<T>(text) {
        return Ok(value);
    }

    let repaired = strip_trailing_commas(text);
    serde_json::from_str::<T>(&repaired).map_err(|e| {
        JsonError::new(format!(
            "model output is not valid JSON ({e}); raw text: {raw}"
        ))
    })
}

/// The inner content of the first fenced code block, if any.
///
/// Accepts an optional language tag after the opening fence (```json).
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the language tag line, if present
    let body_start = match after_fence.find('\n') {
        Some(newline) if after_fence[..newline].trim().chars().all(char::is_alphanumeric) => {
            newline + 1
        }
        _ => 0,
    };
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Truncate to the span between the first opener and the last matching closer.
///
/// Object-shaped wins when `{` appears before `[`; absence of both leaves the
/// text untouched so the parse failure carries the full context.
fn truncate_to_span(text: &str) -> &str {
    let brace = text.find('{');
    let bracket = text.find('[');

    let (open, close) = match (brace, bracket) {
        (Some(b), Some(k)) if b <= k => (b, '}'),
        (Some(b), None) => (b, '}'),
        (_, Some(k)) => (k, ']'),
        (None, None) => return text,
    };

    match text.rfind(close) {
        Some(end) if end > open => &text[open..=end],
        _ => text,
    }
}

/// Remove commas that immediately precede (modulo whitespace) a `}` or `]`.
///
/// String-aware: commas inside string literals are left alone. The scanner
/// works on bytes: every structural character is ASCII, and UTF-8
/// continuation bytes can never equal one, so multi-byte string content
/// passes through untouched.
fn strip_trailing_commas(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                out.push(b);
                i += 1;
            }
            b',' => {
                // Look past whitespace for a closer
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b']') {
                    i += 1; // drop the comma, keep the whitespace and closer
                } else {
                    out.push(b);
                    i += 1;
                }
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    // Only ASCII commas were removed from valid UTF-8 input
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn parses_clean_json() {
        let value: Value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn unwraps_fenced_block_with_tag() {
        let text = "Sure, here is the JSON:\n```json\n{\"a\": [1, 2]}\n```\nHope that helps!";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn unwraps_fence_without_tag() {
        let text = "```\n{\"b\": true}\n```";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["b"], true);
    }

    #[test]
    fn truncates_surrounding_prose() {
        let text = "The analysis follows. {\"title\": \"Fox\"} Done.";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["title"], "Fox");
    }

    #[test]
    fn object_wins_when_brace_comes_first() {
        let text = "note {\"items\": [1]} trailing ] junk";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["items"][0], 1);
    }

    #[test]
    fn array_shaped_payload() {
        let text = "items: [1, 2, 3] end";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value[2], 3);
    }

    #[test]
    fn repairs_trailing_commas() {
        let text = "{\"a\": [1, 2,], \"b\": {\"c\": 3,},}";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["a"][1], 2);
        assert_eq!(value["b"]["c"], 3);
    }

    #[test]
    fn repair_preserves_non_ascii_text() {
        let text = "{\"title\": \"狐狸与乌鸦\", \"names\": [\"Renard\", \"Würfel\",],}";
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["title"], "狐狸与乌鸦");
        assert_eq!(value["names"][1], "Würfel");
    }

    #[test]
    fn keeps_commas_inside_strings() {
        let text = r#"{"a": "x,}", "b": 1,}"#;
        let value: Value = extract_json(text).unwrap();
        assert_eq!(value["a"], "x,}");
        assert_eq!(value["b"], 1);
    }

    #[test]
    fn failure_carries_raw_text() {
        let err = extract_json::<Value>("no structured payload here").unwrap_err();
        assert!(err.message.contains("no structured payload here"));
    }
}
