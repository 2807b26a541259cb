//! Extraction of `<think>`, `<tool>` and `<answer>` blocks from model text.
//!
//! This is a tolerant scanner, not a grammar: each block is located by the
//! first opening tag and the first closing tag after it. Malformed tool JSON
//! is logged and treated as "no tool call" so the loop keeps going.

use scout_core::tool::ToolCallRequest;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const THINK: (&str, &str) = ("<think>", "</think>");
const TOOL: (&str, &str) = ("<tool>", "</tool>");
const ANSWER: (&str, &str) = ("<answer>", "</answer>");

const TOOL_RESULT_MARKER: &str = "Tool result";

/// Minimum length of trailing text after a tool-result marker that counts
/// as an implicit answer.
const TRAILING_ANSWER_MIN_CHARS: usize = 100;

/// Minimum length of unmarked text that counts as an implicit answer.
const IMPLICIT_ANSWER_MIN_CHARS: usize = 50;

/// Everything the loop needs from one model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub thinking: Option<String>,
    pub tool_call: Option<ToolCallRequest>,
    pub final_answer: Option<String>,
    /// Set when `final_answer` came from unmarked text rather than a block.
    pub implicit_answer: bool,
}

/// Byte range of the inner text of the first `open ... close` block at or
/// after `from`.
fn find_block(text: &str, (open, close): (&str, &str), from: usize) -> Option<(usize, usize)> {
    let start = text[from..].find(open)? + from + open.len();
    let end = text[start..].find(close)? + start;
    Some((start, end))
}

fn block<'a>(text: &'a str, tags: (&str, &str)) -> Option<&'a str> {
    find_block(text, tags, 0).map(|(start, end)| text[start..end].trim())
}

pub fn extract_thinking(text: &str) -> Option<String> {
    block(text, THINK).map(str::to_string)
}

/// Parse the payload of a tool block.
///
/// Accepts `{"name", "args": {...}}` and the flat `{"name", ...args}`
/// form, and retries once with `{{`/`}}` collapsed to single braces.
pub fn parse_tool_payload(payload: &str) -> Option<ToolCallRequest> {
    let payload = payload.trim();
    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(first) => {
            let normalized = payload.replace("{{", "{").replace("}}", "}");
            match serde_json::from_str(&normalized) {
                Ok(v) => {
                    debug!("Tool JSON parsed after brace normalization");
                    v
                }
                Err(_) => {
                    warn!(error = %first, payload, "Invalid tool JSON");
                    return None;
                }
            }
        }
    };

    let Value::Object(mut object) = value else {
        warn!(payload, "Tool payload is not a JSON object");
        return None;
    };
    let Some(name) = object.get("name").and_then(Value::as_str).map(str::to_string) else {
        warn!(payload, "Tool payload has no name");
        return None;
    };

    let nested = match object.remove("args") {
        Some(Value::Object(args)) => args,
        _ => Map::new(),
    };
    let args = if nested.is_empty() {
        object.remove("name");
        object
    } else {
        nested
    };
    Some(ToolCallRequest::new(name, args))
}

pub fn extract_tool_call(text: &str) -> Option<ToolCallRequest> {
    block(text, TOOL).and_then(parse_tool_payload)
}

/// Every parsable tool block, in order.
pub fn extract_tool_calls(text: &str) -> Vec<ToolCallRequest> {
    let mut calls = Vec::new();
    let mut from = 0;
    while let Some((start, end)) = find_block(text, TOOL, from) {
        if let Some(call) = parse_tool_payload(&text[start..end]) {
            calls.push(call);
        }
        from = end + TOOL.1.len();
    }
    calls
}

/// The answer block, or long non-JSON text after the last tool-result marker.
pub fn extract_final_answer(text: &str) -> Option<String> {
    if let Some(answer) = block(text, ANSWER) {
        return (!answer.is_empty()).then(|| answer.to_string());
    }

    let marker = text.rfind(TOOL_RESULT_MARKER)?;
    let after_marker = &text[marker..];
    let colon = after_marker.find(':')?;
    let trailing = after_marker[colon + 1..].trim();
    if trailing.chars().count() > TRAILING_ANSWER_MIN_CHARS && !trailing.starts_with('{') {
        warn!(chars = trailing.chars().count(), "Using trailing text after tool result as the answer");
        return Some(trailing.to_string());
    }
    None
}

/// Remove think and tool spans (answer spans stay) from user-facing text.
pub fn strip_control_markup(text: &str) -> String {
    let mut out = text.to_string();
    for (open, close) in [THINK, TOOL] {
        while let Some(start) = out.find(open) {
            match out[start..].find(close) {
                Some(rel_end) => out.replace_range(start..start + rel_end + close.len(), ""),
                None => {
                    out.truncate(start);
                    break;
                }
            }
        }
    }
    out
}

pub fn parse_response(text: &str) -> ParsedResponse {
    let thinking = extract_thinking(text);
    let tool_call = extract_tool_call(text);
    let mut final_answer = extract_final_answer(text);
    let mut implicit_answer = false;

    if thinking.is_none() && tool_call.is_none() && final_answer.is_none() {
        let trimmed = text.trim();
        if trimmed.chars().count() > IMPLICIT_ANSWER_MIN_CHARS {
            debug!("Treating unmarked response as the answer");
            final_answer = Some(trimmed.to_string());
            implicit_answer = true;
        }
    }

    ParsedResponse {
        thinking,
        tool_call,
        final_answer,
        implicit_answer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn each_block_is_extracted_independently() {
        let text = r#"<answer>Acme raised $20M.</answer>
<tool>{"name": "web_search", "args": {"query": "acme funding"}}</tool>
<think>Need funding data</think>"#;

        assert_eq!(extract_thinking(text).as_deref(), Some("Need funding data"));
        assert_eq!(
            extract_tool_call(text),
            Some(ToolCallRequest::new("web_search", args(json!({"query": "acme funding"}))))
        );
        assert_eq!(extract_final_answer(text).as_deref(), Some("Acme raised $20M."));
    }

    #[test]
    fn absent_blocks_are_none() {
        assert_eq!(extract_thinking("plain"), None);
        assert_eq!(extract_tool_call("plain"), None);
        assert_eq!(extract_final_answer("plain"), None);
    }

    #[test]
    fn unterminated_block_is_ignored() {
        assert_eq!(extract_thinking("<think>never closed"), None);
    }

    #[test]
    fn flat_arguments_are_accepted() {
        let call = extract_tool_call(r#"<tool>{"name": "file_read", "path": "a.md"}</tool>"#).unwrap();
        assert_eq!(call.name, "file_read");
        assert_eq!(call.args, args(json!({"path": "a.md"})));
    }

    #[test]
    fn empty_nested_args_fall_back_to_siblings() {
        let call = extract_tool_call(r#"<tool>{"name": "file_list", "args": {}, "path": "output"}</tool>"#).unwrap();
        assert_eq!(call.args, args(json!({"path": "output"})));
    }

    #[test]
    fn doubled_braces_are_normalized() {
        let call =
            extract_tool_call(r#"<tool>{{"name": "web_search", "args": {{"query": "x"}}}}</tool>"#).unwrap();
        assert_eq!(call.name, "web_search");
        assert_eq!(call.args, args(json!({"query": "x"})));
    }

    #[test]
    fn nested_objects_parse_without_normalization() {
        let call =
            extract_tool_call(r#"<tool>{"name": "t", "args": {"a": {"b": {"c": 1}}}}</tool>"#).unwrap();
        assert_eq!(call.args, args(json!({"a": {"b": {"c": 1}}})));
    }

    #[test]
    fn malformed_tool_json_is_no_call() {
        assert_eq!(extract_tool_call("<tool>{name: web_search</tool>"), None);
        assert_eq!(extract_tool_call(r#"<tool>{"args": {}}</tool>"#), None);
        assert_eq!(extract_tool_call(r#"<tool>["web_search"]</tool>"#), None);
    }

    #[test]
    fn multiple_tool_blocks() {
        let text = r#"<tool>{"name": "a"}</tool> then <tool>bad</tool> and <tool>{"name": "b", "args": {"x": 1}}</tool>"#;
        let names: Vec<String> = extract_tool_calls(text).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn trailing_text_after_tool_result_is_an_answer() {
        let tail = "Acme is a retail company headquartered in Denver. They migrated to a new checkout in 2023 and grew revenue.";
        let text = format!("Tool result from web_search: {tail}");
        assert_eq!(extract_final_answer(&text).as_deref(), Some(tail));

        let text = format!("Tool result: {tail}");
        assert_eq!(extract_final_answer(&text).as_deref(), Some(tail));
    }

    #[test]
    fn short_or_json_trailing_text_is_not_an_answer() {
        assert_eq!(extract_final_answer("Tool result: short"), None);
        let json_tail = format!("Tool result: {{\"results\": \"{}\"}}", "x".repeat(200));
        assert_eq!(extract_final_answer(&json_tail), None);
    }

    #[test]
    fn empty_answer_block_is_none() {
        assert_eq!(extract_final_answer("<answer>   </answer>"), None);
    }

    #[test]
    fn strip_keeps_answer_spans() {
        let text = "<think>hmm</think>Hello <tool>{\"name\":\"x\"}</tool><answer>Hi</answer>";
        assert_eq!(strip_control_markup(text), "Hello <answer>Hi</answer>");
        assert_eq!(strip_control_markup("ok <think>unterminated"), "ok ");
    }

    #[test]
    fn long_unmarked_text_is_an_implicit_answer() {
        let text = "Acme Corp sells industrial anvils to cartoon coyotes across the southwest.";
        let parsed = parse_response(text);
        assert_eq!(parsed.final_answer.as_deref(), Some(text));
        assert!(parsed.implicit_answer);
    }

    #[test]
    fn implicit_answer_is_the_trimmed_reply_verbatim() {
        let body = "Acme Corp:\n  - sells anvils\n  - <tool>{name: broken}</tool> was not a call";
        let parsed = parse_response(&format!("\n  {body}  \n"));
        assert_eq!(parsed.final_answer.as_deref(), Some(body));
        assert!(parsed.tool_call.is_none());
    }

    #[test]
    fn short_unmarked_text_yields_nothing() {
        let parsed = parse_response("ok, let me check");
        assert_eq!(parsed, ParsedResponse::default());
    }

    #[test]
    fn implicit_answer_counts_characters_not_bytes() {
        // 26 two-byte characters: 52 bytes but only 26 chars
        let text = "é".repeat(26);
        assert!(parse_response(&text).final_answer.is_none());
    }

    #[test]
    fn thinking_suppresses_implicit_answer() {
        let text = format!("<think>plan</think>{}", "x".repeat(80));
        let parsed = parse_response(&text);
        assert_eq!(parsed.thinking.as_deref(), Some("plan"));
        assert!(parsed.final_answer.is_none());
    }
}
