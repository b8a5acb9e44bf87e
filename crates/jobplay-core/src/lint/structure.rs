use async_trait::async_trait;

use super::{LintResult, Linter};
use crate::error::LintError;
use crate::models::Playbook;

/// Parses the playbook and reports shape problems. Needs no external tools.
#[derive(Debug, Default, Clone)]
pub struct StructureLinter;

#[async_trait]
impl Linter for StructureLinter {
    fn name(&self) -> &str {
        "structure"
    }

    async fn lint(&self, playbook_text: &str) -> Result<LintResult, LintError> {
        let playbook = match Playbook::parse(playbook_text) {
            Ok(playbook) => playbook,
            Err(e) => {
                return Ok(LintResult {
                    passed: false,
                    output: format!("syntax: {}", e),
                })
            }
        };

        let issues = playbook.structural_issues();
        Ok(LintResult {
            passed: issues.is_empty(),
            output: issues
                .iter()
                .map(|issue| format!("structure: {}", issue))
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }
}
