//! # Tool Call Argument Parsing
//!
//! Tool arguments arrive as raw JSON fragments spread over many deltas.
//! [`PartialJson`] accumulates them and keeps the last object that could be
//! parsed, so a live view always has *some* arguments. Its contract is
//! "last successful parse, or none"; it never invents keys.
//!
//! Every parse is strict. A truncated buffer such as `{"x":` does not parse,
//! so the previous value stays in place until the fragment that completes it.

use serde_json::{Map, Value};
use tracing::warn;
use vtx_core::text::truncate_str;

/// Context for logging when tool call parsing fails.
#[derive(Clone, Debug, Default)]
pub struct ToolCallContext {
    /// The tool call ID (for correlation).
    pub tool_call_id: Option<String>,
    /// The tool name.
    pub tool_name: Option<String>,
}

/// Accumulator for streamed tool argument JSON.
#[derive(Clone, Debug, Default)]
pub struct PartialJson {
    raw: String,
    last_good: Option<Map<String, Value>>,
}

impl PartialJson {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw text received so far.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Last object that parsed, if any.
    pub fn last_good(&self) -> Option<&Map<String, Value>> {
        self.last_good.as_ref()
    }

    /// Append a fragment and attempt a strict parse of the whole buffer.
    ///
    /// Returns `true` when the parse succeeded and `last_good` changed.
    pub fn push(&mut self, fragment: &str) -> bool {
        self.raw.push_str(fragment);
        match parse_object(&self.raw) {
            Some(map) => {
                self.last_good = Some(map);
                true
            }
            None => false,
        }
    }

    /// Final arguments: a strict parse of the whole buffer, else the last
    /// good parse, else an empty object.
    pub fn finish(self, context: &ToolCallContext) -> Map<String, Value> {
        let trimmed = self.raw.trim();
        if trimmed.is_empty() {
            return Map::new();
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!(
                    tool_call_id = context.tool_call_id.as_deref(),
                    tool_name = context.tool_name.as_deref(),
                    parsed_type = truncate_str(&other.to_string(), 20),
                    "Tool call arguments parsed as non-object, using last good parse"
                );
                self.last_good.unwrap_or_default()
            }
            Err(e) => {
                warn!(
                    tool_call_id = context.tool_call_id.as_deref(),
                    tool_name = context.tool_name.as_deref(),
                    error = %e,
                    args_preview = truncate_str(trimmed, 100),
                    "Failed to parse tool call arguments, using last good parse"
                );
                self.last_good.unwrap_or_default()
            }
        }
    }
}

/// Parse a complete JSON document that must be an object.
///
/// Returns `None` for empty input, invalid or truncated JSON, and non-object
/// values.
pub fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing::Level;
    use vtx_core::logging::capture_logs;

    fn ctx() -> ToolCallContext {
        ToolCallContext {
            tool_call_id: Some("toolu_1".into()),
            tool_name: Some("read".into()),
        }
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ── parse_object ─────────────────────────────────────────────────────

    #[test]
    fn complete_object() {
        assert_eq!(parse_object(r#"{"a": 1}"#), Some(obj(json!({"a": 1}))));
    }

    #[test]
    fn open_string_does_not_parse() {
        assert_eq!(parse_object(r#"{"path": "/tm"#), None);
    }

    #[test]
    fn open_brackets_do_not_parse() {
        assert_eq!(parse_object(r#"{"a": [1, {"b": 2"#), None);
    }

    #[test]
    fn trailing_comma_and_colon_do_not_parse() {
        assert_eq!(parse_object(r#"{"a": 1,"#), None);
        assert_eq!(parse_object(r#"{"a":"#), None);
    }

    #[test]
    fn dangling_key_is_not_invented() {
        assert_eq!(parse_object(r#"{"a": 1, "b"#), None);
    }

    #[test]
    fn non_object_and_empty() {
        assert_eq!(parse_object("[1, 2]"), None);
        assert_eq!(parse_object("42"), None);
        assert_eq!(parse_object("   "), None);
    }

    #[test]
    fn escaped_quote_inside_complete_string() {
        assert_eq!(
            parse_object(r#"{"q": "say \"hi\""}"#),
            Some(obj(json!({"q": "say \"hi\""})))
        );
        assert_eq!(parse_object(r#"{"q": "say \"hi"#), None);
    }

    // ── PartialJson ──────────────────────────────────────────────────────

    #[test]
    fn two_deltas_build_arguments() {
        let mut acc = PartialJson::new();
        let _ = acc.push(r#"{"path":"#);
        let _ = acc.push(r#" "/tmp"}"#);
        assert_eq!(acc.raw(), r#"{"path": "/tmp"}"#);
        assert_eq!(acc.finish(&ctx()), obj(json!({"path": "/tmp"})));
    }

    #[test]
    fn value_stays_empty_until_fragment_completes_it() {
        let mut acc = PartialJson::new();
        assert!(!acc.push(r#"{"x":"#));
        assert_eq!(acc.last_good(), None);
        assert!(acc.push("1}"));
        assert_eq!(acc.last_good(), Some(&obj(json!({"x": 1}))));
    }

    #[test]
    fn keeps_last_good_parse_across_failed_pushes() {
        let mut acc = PartialJson::new();
        assert!(acc.push(r#"{"a": 1}"#));
        assert!(!acc.push(r#" trailing"#));
        assert_eq!(acc.last_good(), Some(&obj(json!({"a": 1}))));
    }

    #[test]
    fn finish_falls_back_to_last_good_and_warns() {
        let (logs, _guard) = capture_logs();
        let mut acc = PartialJson::new();
        let _ = acc.push(r#"{"a": 1}"#);
        let _ = acc.push(r#" trailing"#);
        assert_eq!(acc.finish(&ctx()), obj(json!({"a": 1})));
        assert!(logs.has_event(Level::WARN, "Failed to parse tool call arguments"));
    }

    #[test]
    fn truncated_arguments_finish_empty() {
        let mut acc = PartialJson::new();
        let _ = acc.push(r#"{"cmd": "rm -rf /tmp/bu"#);
        assert!(acc.finish(&ctx()).is_empty());
    }

    #[test]
    fn finish_without_any_good_parse_is_empty() {
        let mut acc = PartialJson::new();
        let _ = acc.push("{\"a");
        assert!(acc.finish(&ctx()).is_empty());
    }

    #[test]
    fn finish_empty_is_empty_object() {
        assert!(PartialJson::new().finish(&ctx()).is_empty());
    }
}
