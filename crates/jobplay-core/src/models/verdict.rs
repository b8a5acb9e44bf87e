//! Review verdict emitted by the review role.
//!
//! ```json
//! {
//!   "status": "not valid",
//!   "comments": "The playbook is missing a cron job.",
//!   "improvements": ["Add a cron task for the daily 01:00 schedule."]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{OutputError, Warning};
use crate::models::feedback::Feedback;
use crate::models::output::{outer_span, parse_structured, strip_code_fence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReviewStatus {
    Valid,
    NotValid,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NotValid => "not_valid",
        }
    }

    /// Accepts `valid`, `not valid`, `not_valid`, `not-valid` and `invalid`, any case.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "valid" => Some(Self::Valid),
            "not valid" | "invalid" => Some(Self::NotValid),
            _ => None,
        }
    }
}

impl TryFrom<String> for ReviewStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown review status '{}'", value))
    }
}

impl From<ReviewStatus> for String {
    fn from(status: ReviewStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub status: ReviewStatus,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl ReviewVerdict {
    pub fn valid(comments: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Valid,
            comments: comments.into(),
            improvements: Vec::new(),
        }
    }

    pub fn not_valid(comments: impl Into<String>, improvements: Vec<String>) -> Self {
        Self {
            status: ReviewStatus::NotValid,
            comments: comments.into(),
            improvements,
        }
    }

    /// Parse the reviewer's answer. Surrounding prose is tolerated as long as
    /// it contains one JSON/YAML object.
    pub fn parse(text: &str) -> Result<Self, OutputError> {
        match parse_structured::<Self>(text) {
            Ok(verdict) => Ok(verdict),
            Err(OutputError::Empty) => Err(OutputError::Empty),
            Err(err) => outer_span(strip_code_fence(text), '{', '}')
                .and_then(|span| serde_json::from_str::<Self>(span).ok())
                .ok_or(err),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == ReviewStatus::Valid
    }

    /// A valid verdict should not ask for improvements. Reported, never enforced.
    pub fn anomaly(&self) -> Option<Warning> {
        (self.is_valid() && !self.improvements.is_empty()).then(|| Warning::ValidWithImprovements {
            count: self.improvements.len(),
        })
    }

    pub fn feedback(&self) -> Feedback {
        Feedback::new(self.improvements.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_variants() {
        assert_eq!(ReviewStatus::parse("valid"), Some(ReviewStatus::Valid));
        assert_eq!(ReviewStatus::parse("VALID "), Some(ReviewStatus::Valid));
        assert_eq!(ReviewStatus::parse("not valid"), Some(ReviewStatus::NotValid));
        assert_eq!(ReviewStatus::parse("not_valid"), Some(ReviewStatus::NotValid));
        assert_eq!(ReviewStatus::parse("Not-Valid"), Some(ReviewStatus::NotValid));
        assert_eq!(ReviewStatus::parse("invalid"), Some(ReviewStatus::NotValid));
        assert_eq!(ReviewStatus::parse("maybe"), None);
    }

    #[test]
    fn test_parse_verdict_with_prose() {
        let text = r#"Here is my review:
{
  "status": "not valid",
  "comments": "The Control-M Job is missing a cron job in Ansible Playbook.",
  "improvements": ["Add a cron job", "Move delay into the retry loop"]
}
Let me know if you need more."#;
        let verdict = ReviewVerdict::parse(text).unwrap();
        assert_eq!(verdict.status, ReviewStatus::NotValid);
        assert_eq!(verdict.improvements.len(), 2);
        assert_eq!(verdict.feedback().render(), "Add a cron job\nMove delay into the retry loop");
    }

    #[test]
    fn test_parse_verdict_yaml() {
        let verdict = ReviewVerdict::parse("status: valid\ncomments: looks good\n").unwrap();
        assert!(verdict.is_valid());
        assert!(verdict.improvements.is_empty());
        assert!(verdict.anomaly().is_none());
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        assert!(ReviewVerdict::parse(r#"{"status": "probably fine"}"#).is_err());
        assert!(ReviewVerdict::parse("The playbook looks fine to me.").is_err());
    }

    #[test]
    fn test_valid_with_improvements_is_an_anomaly() {
        let verdict = ReviewVerdict::parse(
            r#"{"status": "valid", "comments": "ok", "improvements": ["rename task"]}"#,
        )
        .unwrap();
        assert!(verdict.is_valid());
        assert_eq!(verdict.anomaly(), Some(Warning::ValidWithImprovements { count: 1 }));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_value(ReviewVerdict::not_valid("c", vec![])).unwrap();
        assert_eq!(json["status"], "not_valid");
    }
}
