//! External linter, e.g. `ansible-lint --nocolor` or `yamllint -f parsable`.
//!
//! The playbook is written to a temporary `.yml` file whose path is appended
//! to the command line. Exit status 0 means passed; stdout and stderr are
//! combined into the lint output.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use super::{LintResult, Linter};
use crate::error::LintError;

#[derive(Debug, Clone)]
pub struct CommandLinter {
    command_line: String,
}

impl CommandLinter {
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
        }
    }

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("jobplay-lint-{}.yml", uuid::Uuid::new_v4()))
    }
}

#[async_trait]
impl Linter for CommandLinter {
    fn name(&self) -> &str {
        &self.command_line
    }

    async fn lint(&self, playbook_text: &str) -> Result<LintResult, LintError> {
        let mut parts = self.command_line.split_whitespace();
        let program = parts.next().ok_or(LintError::EmptyCommand)?;

        let path = Self::scratch_path();
        tokio::fs::write(&path, playbook_text)
            .await
            .map_err(|source| LintError::Spawn {
                command: self.command_line.clone(),
                source,
            })?;

        let output = Command::new(program).args(parts).arg(&path).output().await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!("[Lint] Failed to remove {}: {}", path.display(), e);
        }

        let output = output.map_err(|source| LintError::Spawn {
            command: self.command_line.clone(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        // The scratch path is noise for the reviewer.
        let text = text.replace(&path.to_string_lossy().to_string(), "playbook.yml");

        Ok(LintResult {
            passed: output.status.success(),
            output: text.trim().to_string(),
        })
    }
}
