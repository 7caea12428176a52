//! # JSON Extraction
//!
//! Completion models are asked to answer with pure JSON but routinely wrap
//! it in explanatory prose or markdown fences. This module pulls the JSON
//! object back out: everything from the first `{` to the last `}` in the
//! input is attempted as one strict parse.
//!
//! The widest-span approach is a documented best effort. Input holding two
//! top-level objects concatenated, or unrelated brace pairs outside the
//! intended object, produces a span that fails to parse; that failure is
//! soft (`MalformedPayload`), never a crash, and callers treat it as "no
//! structured data available".

use crate::error::AppError;
use serde_json::Value;

/// Extract the JSON object embedded in `input`, if any.
///
/// ## Returns:
/// - `Ok(Some(value))` when the first-`{`-to-last-`}` span parses as JSON
/// - `Ok(None)` when the input contains no such span at all
/// - `Err(AppError::MalformedPayload)` when a span exists but is not valid
///   JSON
pub fn extract_json(input: &str) -> Result<Option<Value>, AppError> {
    let start = match input.find('{') {
        Some(idx) => idx,
        None => return Ok(None),
    };
    let end = match input.rfind('}') {
        Some(idx) if idx >= start => idx,
        _ => return Ok(None),
    };

    let span = &input[start..=end];
    match serde_json::from_str::<Value>(span) {
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(AppError::MalformedPayload(format!(
            "candidate span did not parse as JSON: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_object_surrounded_by_prose() {
        let input = "Sure! Here is the analysis you asked for:\n\
                     {\"overall_sentiment\": {\"positive\": 0.8}}\n\
                     Let me know if you need anything else.";
        let value = extract_json(input).unwrap().unwrap();
        assert_eq!(value, json!({"overall_sentiment": {"positive": 0.8}}));
    }

    #[test]
    fn test_extracts_object_inside_markdown_fence() {
        let input = "```json\n{\"score\": 1.0}\n```";
        let value = extract_json(input).unwrap().unwrap();
        assert_eq!(value, json!({"score": 1.0}));
    }

    #[test]
    fn test_nested_braces_stay_inside_the_span() {
        let input = "result: {\"outer\": {\"inner\": [1, 2, 3]}} done";
        let value = extract_json(input).unwrap().unwrap();
        assert_eq!(value["outer"]["inner"], json!([1, 2, 3]));
    }

    #[test]
    fn test_no_braces_is_a_no_match_not_an_error() {
        assert!(extract_json("no structured data here").unwrap().is_none());
        assert!(extract_json("").unwrap().is_none());
    }

    #[test]
    fn test_close_brace_before_open_brace_is_a_no_match() {
        assert!(extract_json("} nothing {").unwrap().is_none());
    }

    #[test]
    fn test_unparseable_span_is_a_soft_failure() {
        let err = extract_json("{this is not json}").unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }

    /// Two concatenated top-level objects form one widest span that is not
    /// valid JSON. Best-effort limitation: reported as malformed, not fixed.
    #[test]
    fn test_concatenated_objects_fail_softly() {
        let err = extract_json("{\"a\": 1} {\"b\": 2}").unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }

    #[test]
    fn test_multibyte_text_around_the_object() {
        let input = "Résultat — voilà: {\"ok\": true} ✓";
        let value = extract_json(input).unwrap().unwrap();
        assert_eq!(value, json!({"ok": true}));
    }
}
