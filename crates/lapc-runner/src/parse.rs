//! Lenient extraction of a JSON object from generation output.
//!
//! Generator output is not guaranteed well-formed: the object may be
//! wrapped in code fences or interleaved with explanatory prose. Parsing
//! policy, in order:
//!
//! 1. strip a leading/trailing code fence if present and parse strictly;
//! 2. on failure, take the `first '{' ..= last '}'` window and parse that;
//! 3. if both fail, surface a terminal `ParseFailure`.
//!
//! Only structural extraction plus strict `serde_json` parsing — nothing
//! is ever evaluated.

use serde_json::Value;

use crate::errors::RunnerError;

/// Extract a JSON value from possibly fenced / prose-wrapped text.
pub fn json_payload(raw: &str) -> Result<Value, RunnerError> {
    let text = strip_code_fence(raw.trim());
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    if let Some(window) = brace_window(text) {
        if let Ok(value) = serde_json::from_str::<Value>(window) {
            return Ok(value);
        }
    }
    Err(RunnerError::ParseFailure(format!(
        "no parseable JSON object in response ({} chars)",
        raw.len()
    )))
}

/// Strip a single surrounding ``` or ```json fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Largest brace-delimited window: first `{` through last `}`.
fn brace_window(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_json() {
        let value = json_payload(r#"{"a": 1, "b": [2, 3]}"#).unwrap();
        assert_eq!(value, json!({"a": 1, "b": [2, 3]}));
    }

    #[test]
    fn round_trips_fenced_json() {
        let original = json!({"pass": false, "score_0_100": 80, "failures": []});
        let fenced = format!("```json\n{}\n```", serde_json::to_string_pretty(&original).unwrap());
        assert_eq!(json_payload(&fenced).unwrap(), original);
    }

    #[test]
    fn round_trips_fence_without_info_string() {
        let original = json!({"answers": {"q1": "yes"}});
        let fenced = format!("```\n{original}\n```");
        assert_eq!(json_payload(&fenced).unwrap(), original);
    }

    #[test]
    fn recovers_object_surrounded_by_prose() {
        let original = json!({"questions": [{"id": "q1", "question": "What?"}]});
        let noisy = format!(
            "Sure, here is the battery you asked for:\n```json\n{original}\n```\nLet me know if you need more."
        );
        assert_eq!(json_payload(&noisy).unwrap(), original);
    }

    #[test]
    fn recovers_bare_object_with_prose() {
        let noisy = r#"The verdict follows. {"pass": true, "score_0_100": 97} Done."#;
        let value = json_payload(noisy).unwrap();
        assert_eq!(value["score_0_100"], 97);
    }

    #[test]
    fn rejects_text_without_json() {
        let err = json_payload("I am unable to answer that.").unwrap_err();
        assert!(matches!(err, RunnerError::ParseFailure(_)));
    }

    #[test]
    fn rejects_unbalanced_garbage() {
        let err = json_payload("} not json {").unwrap_err();
        assert!(matches!(err, RunnerError::ParseFailure(_)));
    }
}
