//! Decoding model output into an answer list

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::providers::GatewayResponse;

/// Decode a raw completion.
///
/// Reasoning blocks (`<think>...</think>`) and markdown code fences are
/// removed first. Accepted shapes are `{"answers": [...]}` and a bare array.
/// Numbers and booleans in the array are kept as their JSON text; any other
/// shape is `Malformed` with the original text.
pub fn parse_answers(raw: &str) -> GatewayResponse {
    let cleaned = strip_code_fences(&strip_think_blocks(raw));

    let parsed = serde_json::from_str::<Value>(&cleaned)
        .ok()
        .or_else(|| embedded_json(&cleaned));

    let answers = match parsed {
        Some(Value::Object(mut map)) => match map.remove("answers") {
            Some(Value::Array(items)) => answer_strings(items),
            _ => None,
        },
        Some(Value::Array(items)) => answer_strings(items),
        _ => None,
    };

    match answers {
        Some(answers) => GatewayResponse::ParsedAnswers(answers),
        None => GatewayResponse::Malformed(raw.to_string()),
    }
}

fn answer_strings(items: Vec<Value>) -> Option<Vec<String>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

/// `<think>` blocks, case-insensitive; an unclosed block runs to the end
static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<think>.*?(?:</think>|$)").expect("Invalid regex"));

/// A whole-response code fence with an optional info string such as `json`
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n?(.*?)\s*```$").expect("Invalid regex")
});

/// Outermost object span, then outermost array span
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("Invalid regex"));
static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("Invalid regex"));

/// Remove every `<think>...</think>` block (case-insensitive); an unclosed block runs to the end
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    match CODE_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Parse the outermost `{...}` or `[...]` span when the model wrapped JSON in prose
fn embedded_json(text: &str) -> Option<Value> {
    [&*JSON_OBJECT, &*JSON_ARRAY]
        .iter()
        .filter_map(|pattern| pattern.find(text))
        .find_map(|span| serde_json::from_str(span.as_str()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(v: &[&str]) -> GatewayResponse {
        GatewayResponse::ParsedAnswers(v.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_answers_object() {
        assert_eq!(
            parse_answers(r#"{"answers": ["$500", "fire and theft"]}"#),
            answers(&["$500", "fire and theft"])
        );
    }

    #[test]
    fn test_bare_array() {
        assert_eq!(parse_answers(r#"["yes", 30, true]"#), answers(&["yes", "30", "true"]));
    }

    #[test]
    fn test_think_block_and_fence() {
        let raw = "<think>The premium\nis in section 2</think>\n```json\n{\"answers\": [\"$500\"]}\n```";
        assert_eq!(parse_answers(raw), answers(&["$500"]));
    }

    #[test]
    fn test_json_inside_prose() {
        let raw = "Here you go: {\"answers\": [\"30 days\"]} Hope this helps.";
        assert_eq!(parse_answers(raw), answers(&["30 days"]));
    }

    #[test]
    fn test_malformed_keeps_raw_text() {
        let raw = "I could not find that.";
        assert_eq!(parse_answers(raw), GatewayResponse::Malformed(raw.to_string()));
        assert!(matches!(
            parse_answers(r#"{"result": ["a"]}"#),
            GatewayResponse::Malformed(_)
        ));
        assert!(matches!(
            parse_answers(r#"{"answers": [{"text": "a"}]}"#),
            GatewayResponse::Malformed(_)
        ));
    }

    #[test]
    fn test_strip_think_blocks() {
        assert_eq!(strip_think_blocks("<THINK>x</THINK> a <think>y</think>b"), "a b");
        assert_eq!(strip_think_blocks("answer <think>never closed"), "answer");
        assert_eq!(strip_think_blocks("<think>\nmulti\nline\n</think>\n[\"a\"]"), "[\"a\"]");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fences("```\n{\"answers\": []}```"), "{\"answers\": []}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
        assert_eq!(strip_code_fences("```json\n[\"unclosed\"]"), "```json\n[\"unclosed\"]");
    }

    #[test]
    fn test_unclosed_fence_still_parses_embedded_json() {
        assert_eq!(parse_answers("```json\n[\"a\", \"b\"]"), answers(&["a", "b"]));
    }
}
