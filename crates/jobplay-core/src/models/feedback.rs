use serde::{Deserialize, Serialize};

/// Ordered improvement items carried from one review into the next conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feedback(Vec<String>);

impl Feedback {
    pub fn new(items: Vec<String>) -> Self {
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|item| item.trim().is_empty())
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    /// Text substituted into `{feedback}`: items joined by a single newline.
    pub fn render(&self) -> String {
        self.0.join("\n")
    }
}

impl From<Vec<String>> for Feedback {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_joins_with_newline() {
        let feedback = Feedback::new(vec!["fix A".to_string(), "fix B".to_string()]);
        assert_eq!(feedback.render(), "fix A\nfix B");
    }

    #[test]
    fn test_default_is_empty() {
        let feedback = Feedback::default();
        assert!(feedback.is_empty());
        assert_eq!(feedback.render(), "");
    }
}
