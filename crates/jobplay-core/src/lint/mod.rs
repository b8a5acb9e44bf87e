//! Linters run on a candidate playbook before review. Their output is
//! handed to the reviewer verbatim through `{lint}`.

pub mod command;
pub mod structure;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LintError;

pub use command::CommandLinter;
pub use structure::StructureLinter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResult {
    pub passed: bool,
    pub output: String,
}

impl LintResult {
    pub fn clean() -> Self {
        Self {
            passed: true,
            output: String::new(),
        }
    }

    /// Text for the `{lint}` placeholder.
    pub fn render(&self) -> String {
        if self.output.trim().is_empty() {
            if self.passed {
                "No lint issues found.".to_string()
            } else {
                "Lint failed without output.".to_string()
            }
        } else {
            self.output.trim().to_string()
        }
    }
}

#[async_trait]
pub trait Linter: Send + Sync {
    fn name(&self) -> &str;

    async fn lint(&self, playbook_text: &str) -> Result<LintResult, LintError>;
}
