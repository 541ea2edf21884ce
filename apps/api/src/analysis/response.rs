//! Recovers a JSON object from free-form model output.

use serde_json::Value;

use crate::llm_client::LlmError;

/// Parses the model text as JSON. When the text has prose or fences around the
/// payload, falls back to the span from the first `{` to the last `}`.
pub fn parse_json_payload(text: &str) -> Result<Value, LlmError> {
    let trimmed = text.trim();

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(direct) => brace_span(trimmed)
            .and_then(|span| serde_json::from_str::<Value>(span).ok())
            .ok_or_else(|| LlmError::Malformed(direct.to_string()))?,
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(LlmError::Malformed("expected a JSON object".to_string()))
    }
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        let v = parse_json_payload(r#" {"overallScore": 80} "#).unwrap();
        assert_eq!(v["overallScore"], 80);
    }

    #[test]
    fn test_recovers_from_fenced_output() {
        let text = "Here is the analysis:\n```json\n{\"overallScore\": 64, \"nested\": {\"a\": 1}}\n```\nGood luck!";
        let v = parse_json_payload(text).unwrap();
        assert_eq!(v["overallScore"], 64);
        assert_eq!(v["nested"]["a"], 1);
    }

    #[test]
    fn test_unrecoverable_text_is_malformed() {
        assert!(matches!(
            parse_json_payload("I cannot help with that."),
            Err(LlmError::Malformed(_))
        ));
        assert!(matches!(
            parse_json_payload("} backwards {"),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            parse_json_payload("[1, 2, 3]"),
            Err(LlmError::Malformed(_))
        ));
    }
}
