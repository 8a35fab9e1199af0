//! Best-effort parsing of free-text model output.
//!
//! Three stages, tried in order, each usable on its own:
//! 1. `parse_direct`: the trimmed response is JSON.
//! 2. `parse_fenced`: the response is JSON wrapped in a markdown fence.
//! 3. `parse_embedded`: the first `{…}` or `[…]` span (greedy) is JSON.
//!
//! When every stage fails the caller falls back to its template default.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Leftmost `{` to the last `}` after it, or `[` to the last `]`.
static EMBEDDED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}|\[[\s\S]*\]").expect("static regex"));

/// Which stage recovered the value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Direct(Value),
    Fenced(Value),
    Embedded(Value),
    Unparseable,
}

impl ParseOutcome {
    pub fn value(self) -> Option<Value> {
        match self {
            ParseOutcome::Direct(v) | ParseOutcome::Fenced(v) | ParseOutcome::Embedded(v) => {
                Some(v)
            }
            ParseOutcome::Unparseable => None,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            ParseOutcome::Direct(_) => "direct",
            ParseOutcome::Fenced(_) => "fenced",
            ParseOutcome::Embedded(_) => "embedded",
            ParseOutcome::Unparseable => "unparseable",
        }
    }
}

/// Runs the full chain.
pub fn parse_model_output(raw: &str) -> ParseOutcome {
    if let Some(v) = parse_direct(raw) {
        return ParseOutcome::Direct(v);
    }
    if let Some(v) = parse_fenced(raw) {
        return ParseOutcome::Fenced(v);
    }
    if let Some(v) = parse_embedded(raw) {
        return ParseOutcome::Embedded(v);
    }
    ParseOutcome::Unparseable
}

pub fn parse_direct(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

/// Parses a response that is exactly one fenced block.
pub fn parse_fenced(raw: &str) -> Option<Value> {
    let inner = strip_json_fences(raw);
    if inner.len() == raw.trim().len() {
        return None;
    }
    serde_json::from_str(inner).ok()
}

/// Parses the largest brace- or bracket-delimited span in the response.
pub fn parse_embedded(raw: &str) -> Option<Value> {
    let span = EMBEDDED_JSON.find(raw)?;
    serde_json::from_str(span.as_str()).ok()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_parses_plain_json() {
        assert_eq!(
            parse_model_output("  {\"email\": \"a@b.com\"}\n"),
            ParseOutcome::Direct(json!({"email": "a@b.com"}))
        );
    }

    #[test]
    fn test_direct_parses_arrays() {
        assert_eq!(parse_direct("[1, 2]"), Some(json!([1, 2])));
    }

    #[test]
    fn test_fenced_with_json_tag() {
        let raw = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(
            parse_model_output(raw),
            ParseOutcome::Fenced(json!({"key": "value"}))
        );
    }

    #[test]
    fn test_fenced_without_tag() {
        assert_eq!(parse_fenced("```\n[\"a\"]\n```"), Some(json!(["a"])));
    }

    #[test]
    fn test_fenced_ignores_unfenced_text() {
        assert_eq!(parse_fenced("{\"a\": 1}"), None);
    }

    #[test]
    fn test_prose_wrapped_fence_is_recovered_by_embedded_stage() {
        let raw = "Here you go:\n```json\n{\"email\":\"a@b.com\"}\n```";
        assert_eq!(
            parse_model_output(raw),
            ParseOutcome::Embedded(json!({"email": "a@b.com"}))
        );
    }

    #[test]
    fn test_embedded_spans_first_open_to_last_close() {
        let raw = "Result: {\"a\": {\"b\": 1}} -- done";
        assert_eq!(parse_embedded(raw), Some(json!({"a": {"b": 1}})));
    }

    #[test]
    fn test_embedded_finds_array() {
        let raw = "Entries follow [{\"Degree\": \"BSc\"}] thanks";
        assert_eq!(parse_embedded(raw), Some(json!([{"Degree": "BSc"}])));
    }

    #[test]
    fn test_embedded_fails_on_two_separate_objects() {
        // Greedy span covers both objects, which is not valid JSON.
        assert_eq!(parse_embedded("{\"a\": 1} and {\"b\": 2}"), None);
    }

    #[test]
    fn test_prose_without_json_is_unparseable() {
        let outcome = parse_model_output("I could not find any contact details, sorry.");
        assert_eq!(outcome, ParseOutcome::Unparseable);
        assert_eq!(outcome.stage(), "unparseable");
        assert!(outcome.value().is_none());
    }

    #[test]
    fn test_truncated_json_is_unparseable() {
        assert_eq!(
            parse_model_output("{\"email\": \"a@b.com\""),
            ParseOutcome::Unparseable
        );
    }
}
