// Explanation Parser
// Turns free-form LLM output into an ExplanationRecord. LLM output is
// untrusted: try the braced JSON object, default missing fields, and fall back
// to the verbatim text.

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{ExplanationRecord, FAILED_CATEGORY, FAILED_DESCRIPTION};

/// Parse raw LLM output. Never fails.
pub fn parse_explanation(raw: &str) -> ExplanationRecord {
    let Some(json_str) = extract_json(raw) else {
        debug!("[EXPLAIN_PARSER] no braces in output, using raw text");
        return ExplanationRecord::general(raw);
    };

    match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Object(map)) => ExplanationRecord::new(
            field(&map, "reason_category").unwrap_or_else(|| FAILED_CATEGORY.to_string()),
            field(&map, "reason_description").unwrap_or_else(|| FAILED_DESCRIPTION.to_string()),
        ),
        Ok(_) => {
            debug!("[EXPLAIN_PARSER] braced content is not an object, using raw text");
            ExplanationRecord::general(raw)
        }
        Err(e) => {
            debug!("[EXPLAIN_PARSER] JSON parse error: {}, using raw text", e);
            ExplanationRecord::general(raw)
        }
    }
}

/// Slice from the first '{' to the last '}' inclusive. None when either brace
/// is missing; an inverted pair yields an empty slice.
fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    Some(content.get(start..=end).unwrap_or(""))
}

fn field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
