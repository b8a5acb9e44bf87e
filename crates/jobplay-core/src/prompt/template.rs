//! System prompt rendering.
//!
//! Placeholders use single braces (`{feedback}`); `{{` and `}}` produce
//! literal braces so JSON examples can live inside a prompt. Only the
//! placeholders a role declares are substituted. Any other `{...}` is left
//! untouched, and a declared placeholder without a value is an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::AgentError;

/// Values for template placeholders, keyed by placeholder name.
pub type PromptVars = HashMap<String, String>;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Render `template` for `role`, substituting the `recognized` placeholders from `vars`.
pub fn render(
    role: &str,
    template: &str,
    recognized: &[String],
    vars: &PromptVars,
) -> Result<String, AgentError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in token_re().captures_iter(template) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        out.push_str(&template[last..whole.start]);
        last = whole.end;
        out.push_str(&resolve_token(role, &caps, recognized, vars)?);
    }

    out.push_str(&template[last..]);
    Ok(out)
}

fn resolve_token(
    role: &str,
    caps: &Captures<'_>,
    recognized: &[String],
    vars: &PromptVars,
) -> Result<String, AgentError> {
    let whole = &caps[0];
    match caps.get(1) {
        None if whole == "{{" => Ok("{".to_string()),
        None => Ok("}".to_string()),
        Some(name) if recognized.iter().any(|r| r == name.as_str()) => vars
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| AgentError::TemplateRender {
                role: role.to_string(),
                placeholder: name.as_str().to_string(),
            }),
        Some(_) => Ok(whole.to_string()),
    }
}

/// Placeholder names referenced by a template, in order of first use.
pub fn referenced_placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in token_re().captures_iter(template) {
        if let Some(name) = caps.get(1) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn vars(pairs: &[(&str, &str)]) -> PromptVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitutes_recognized_placeholders() {
        let out = render(
            "converter",
            "Today: {datetime}\nFeedback:\n{feedback}",
            &names(&["datetime", "feedback"]),
            &vars(&[("datetime", "2024-01-01 00:00:00 UTC"), ("feedback", "add cron job")]),
        )
        .unwrap();
        assert_eq!(out, "Today: 2024-01-01 00:00:00 UTC\nFeedback:\nadd cron job");
    }

    #[test]
    fn test_missing_recognized_placeholder_fails() {
        let err = render(
            "reviewer",
            "Job: {controlm_job}",
            &names(&["controlm_job"]),
            &PromptVars::new(),
        )
        .unwrap_err();
        match err {
            AgentError::TemplateRender { role, placeholder } => {
                assert_eq!(role, "reviewer");
                assert_eq!(placeholder, "controlm_job");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_placeholder_is_literal() {
        let out = render("r", "keep {job_name} as is", &names(&["feedback"]), &PromptVars::new())
            .unwrap();
        assert_eq!(out, "keep {job_name} as is");
    }

    #[test]
    fn test_double_braces_escape() {
        let out = render(
            "r",
            "{{\n  \"status\": \"{feedback}\"\n}}",
            &names(&["feedback"]),
            &vars(&[("feedback", "x")]),
        )
        .unwrap();
        assert_eq!(out, "{\n  \"status\": \"x\"\n}");
    }

    #[test]
    fn test_empty_value_renders() {
        let out = render("r", "[{feedback}]", &names(&["feedback"]), &vars(&[("feedback", "")]))
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let out = render(
            "r",
            "{feedback}",
            &names(&["feedback", "lint"]),
            &vars(&[("feedback", "{lint} and {{braces}}")]),
        )
        .unwrap();
        assert_eq!(out, "{lint} and {{braces}}");
    }

    #[test]
    fn test_referenced_placeholders() {
        assert_eq!(
            referenced_placeholders("{a} {{b}} {c} {a} {not valid}"),
            names(&["a", "c"])
        );
    }
}
