//! Helpers for pulling structured data out of free-form model output.
//!
//! Models wrap their answers in Markdown fences or surround them with prose,
//! so every parse goes through [`strip_code_fence`] first.

use serde::de::DeserializeOwned;

use crate::error::OutputError;

/// Return the body of the first fenced code block, or the trimmed text when
/// there is no fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    // Skip the info string (```json, ```yaml, ...)
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Slice from the first `open` to the last `close`, if both exist in order.
pub fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output as JSON first, then YAML.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, OutputError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(OutputError::Empty);
    }

    let json_err = match serde_json::from_str::<T>(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    match serde_yaml::from_str::<T>(body) {
        Ok(value) => Ok(value),
        Err(yaml_err) => Err(OutputError::Unparseable(format!(
            "json: {}; yaml: {}",
            json_err, yaml_err
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_with_info_string() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fence_without_fence() {
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }

    #[test]
    fn test_outer_span() {
        assert_eq!(outer_span("x {\"a\": {}} y", '{', '}'), Some("{\"a\": {}}"));
        assert_eq!(outer_span("no braces", '{', '}'), None);
    }

    #[test]
    fn test_parse_structured_falls_back_to_yaml() {
        let value: serde_json::Value = parse_structured("key: value\nlist:\n  - 1\n").unwrap();
        assert_eq!(value["key"], "value");
        assert_eq!(value["list"][0], 1);
    }

    #[test]
    fn test_parse_structured_empty() {
        let err = parse_structured::<serde_json::Value>("```\n```").unwrap_err();
        assert_eq!(err, OutputError::Empty);
    }
}
