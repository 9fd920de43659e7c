//! Recover a single JSON value from a model response.
//!
//! Grounded responses cannot use a JSON mime type, so the payload arrives as
//! free text: often wrapped in a markdown fence, sometimes followed by source
//! commentary. Isolation is structural (string- and bracket-aware) so that
//! brackets inside string literals and trailing prose never confuse it.

use serde::de::DeserializeOwned;
use serde_json::Value;

const FENCE: &str = "```";
const EXCERPT_CHARS: usize = 100;

/// Shape the caller requires from the parsed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Array,
    Object,
    Any,
}

impl Expected {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Array => "a JSON array",
            Self::Object => "a JSON object",
            Self::Any => "a JSON value",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid JSON response received from AI for {context}: {reason}. Raw: {original_excerpt}")]
pub struct ParseError {
    /// What was being parsed, e.g. "details for Acme Retail".
    pub context: String,
    pub reason: String,
    pub original_excerpt: String,
    pub isolated_excerpt: String,
}

impl ParseError {
    fn new(context: &str, reason: impl Into<String>, original: &str, isolated: &str) -> Self {
        Self {
            context: context.to_string(),
            reason: reason.into(),
            original_excerpt: excerpt(original),
            isolated_excerpt: excerpt(isolated),
        }
    }
}

/// Remove a surrounding markdown fence (and its language tag), if present.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };
    let rest = rest.trim_start_matches(|ch: char| ch.is_alphanumeric() || ch == '_');
    let rest = rest.strip_suffix(FENCE).unwrap_or(rest);
    rest.trim()
}

/// Byte offset just past the bracket that closes the first character of
/// `text`, or `None` if `text` does not start with `[`/`{` or never balances.
pub fn balanced_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let (_, open) = chars.next()?;
    let close = match open {
        '[' => ']',
        '{' => '}',
        _ => return None,
    };

    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in chars {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(idx + ch.len_utf8());
            }
        }
    }
    None
}

/// Trim, unfence, and cut `raw` down to its primary JSON value.
///
/// Text that does not start with a bracket is returned as-is so that
/// `serde_json` can report what it actually is.
pub fn isolate_json(raw: &str) -> Result<&str, &'static str> {
    let text = strip_fences(raw);
    if !(text.starts_with('[') || text.starts_with('{')) {
        return Ok(text);
    }
    balanced_end(text)
        .map(|end| &text[..end])
        .ok_or("no balanced closing bracket found")
}

/// Extract the primary JSON value from `raw` and check its shape.
pub fn extract_json(raw: &str, expected: Expected, context: &str) -> Result<Value, ParseError> {
    let isolated =
        isolate_json(raw).map_err(|reason| ParseError::new(context, reason, raw, raw))?;

    let value: Value = serde_json::from_str(isolated)
        .map_err(|error| ParseError::new(context, error.to_string(), raw, isolated))?;

    if !expected.accepts(&value) {
        return Err(ParseError::new(
            context,
            format!("expected {}", expected.describe()),
            raw,
            isolated,
        ));
    }
    Ok(value)
}

/// Extract and deserialize into `T`.
pub fn parse_json_response<T: DeserializeOwned>(
    raw: &str,
    expected: Expected,
    context: &str,
) -> Result<T, ParseError> {
    let value = extract_json(raw, expected, context)?;
    serde_json::from_value(value).map_err(|error| {
        let isolated = isolate_json(raw).unwrap_or(raw);
        ParseError::new(context, error.to_string(), raw, isolated)
    })
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{head}...")
}
