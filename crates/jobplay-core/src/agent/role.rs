//! Role definitions. A role is data: a name, a system prompt template and
//! the placeholders that template may use.
//!
//! Roles can be overridden from YAML files:
//!
//! ```yaml
//! name: "converter"
//! description: "Control-M job → Ansible playbook"
//! placeholders: ["datetime", "feedback"]
//! system_prompt: |
//!   Today Date: {datetime}
//!   ...
//!   Feedback:
//!   {feedback}
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::prompt::builtin::{CONVERT_SYSTEM_PROMPT, REVIEW_SYSTEM_PROMPT};
use crate::prompt::placeholders::{CONTROLM_JOB, DATETIME, FEEDBACK, LINT};
use crate::prompt::template::referenced_placeholders;
use crate::prompt::{render, PromptVars};

pub const CONVERTER: &str = "converter";
pub const REVIEWER: &str = "reviewer";

/// A role agent's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name; also the prefix of the response key
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// System prompt template
    pub system_prompt: String,

    /// Placeholders this role substitutes; others stay literal
    #[serde(default)]
    pub placeholders: Vec<String>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>, placeholders: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: None,
            system_prompt: system_prompt.into(),
            placeholders: placeholders.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Built-in conversion role.
    pub fn converter() -> Self {
        Self {
            description: Some("Converts a Control-M job into an Ansible playbook".to_string()),
            ..Self::new(CONVERTER, CONVERT_SYSTEM_PROMPT, &[DATETIME, FEEDBACK])
        }
    }

    /// Built-in review role.
    pub fn reviewer() -> Self {
        Self {
            description: Some("Reviews a playbook against its Control-M job".to_string()),
            ..Self::new(
                REVIEWER,
                REVIEW_SYSTEM_PROMPT,
                &[DATETIME, FEEDBACK, CONTROLM_JOB, LINT],
            )
        }
    }

    pub fn builtin_roles() -> Vec<Self> {
        vec![Self::converter(), Self::reviewer()]
    }

    /// Key under which this role's output is reported: `"{role}_response"`.
    pub fn response_key(&self) -> String {
        format!("{}_response", self.name)
    }

    pub fn recognizes(&self, placeholder: &str) -> bool {
        self.placeholders.iter().any(|p| p == placeholder)
    }

    /// Recognized placeholders the template actually uses.
    pub fn required_placeholders(&self) -> Vec<String> {
        referenced_placeholders(&self.system_prompt)
            .into_iter()
            .filter(|p| self.recognizes(p))
            .collect()
    }

    /// Render the system prompt. `{datetime}` is `now` unless `vars` sets it.
    pub fn render_at(&self, vars: &PromptVars, now: DateTime<Utc>) -> Result<String, AgentError> {
        let mut values = vars.clone();
        values
            .entry(DATETIME.to_string())
            .or_insert_with(|| now.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        render(&self.name, &self.system_prompt, &self.placeholders, &values)
    }

    pub fn render_now(&self, vars: &PromptVars) -> Result<String, AgentError> {
        self.render_at(vars, Utc::now())
    }

    /// Parse a role definition from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse role YAML: {}", e))
    }

    /// Load a role definition from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read role file '{}': {}", path, e))?;
        Self::from_yaml(&content)
    }
}

/// Role definitions loaded from disk, with the built-ins as fallback.
#[derive(Debug, Default)]
pub struct RoleLoader {
    /// Loaded roles indexed by name
    pub roles: HashMap<String, RoleSpec>,
}

impl RoleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.yaml`/`.yml` file in `dir`.
    ///
    /// A file that omits `placeholders` for a built-in role name inherits the
    /// built-in placeholder set.
    pub fn load_dir(&mut self, dir: &str) -> Result<usize, String> {
        let dir_path = Path::new(dir);
        if !dir_path.is_dir() {
            return Err(format!("Role directory '{}' does not exist", dir));
        }

        let mut count = 0;
        for entry in std::fs::read_dir(dir_path)
            .map_err(|e| format!("Failed to read directory '{}': {}", dir, e))?
        {
            let entry = entry.map_err(|e| format!("Directory entry error: {}", e))?;
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !matches!(ext, "yaml" | "yml") {
                continue;
            }

            let mut role = RoleSpec::from_file(&path.to_string_lossy())?;
            if role.placeholders.is_empty() {
                if let Some(builtin) = Self::builtin(&role.name) {
                    role.placeholders = builtin.placeholders;
                }
            }

            tracing::info!("[RoleLoader] Loaded role: {} ({})", role.name, path.display());
            self.roles.insert(role.name.clone(), role);
            count += 1;
        }

        Ok(count)
    }

    fn builtin(name: &str) -> Option<RoleSpec> {
        RoleSpec::builtin_roles().into_iter().find(|r| r.name == name)
    }

    /// Loaded role by name, falling back to the built-in definition.
    pub fn resolve(&self, name: &str) -> Option<RoleSpec> {
        self.roles.get(name).cloned().or_else(|| Self::builtin(name))
    }

    pub fn is_overridden(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Loaded roles plus any built-in not overridden, sorted by name.
    pub fn all(&self) -> Vec<RoleSpec> {
        let mut roles: Vec<RoleSpec> = self.roles.values().cloned().collect();
        for builtin in RoleSpec::builtin_roles() {
            if !self.roles.contains_key(&builtin.name) {
                roles.push(builtin);
            }
        }
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roles() {
        let converter = RoleSpec::converter();
        assert_eq!(converter.response_key(), "converter_response");
        assert_eq!(
            converter.required_placeholders(),
            vec!["datetime".to_string(), "feedback".to_string()]
        );

        let reviewer = RoleSpec::reviewer();
        assert!(reviewer.recognizes("controlm_job"));
        assert!(reviewer.recognizes("lint"));
        assert!(reviewer.recognizes("feedback"));
        assert!(!converter.recognizes("lint"));
    }

    #[test]
    fn test_parse_role_yaml() {
        let yaml = r#"
name: "security_reviewer"
description: "Checks for privilege escalation"
placeholders: ["datetime", "controlm_job"]
system_prompt: |
  Today: {datetime}
  Job: {controlm_job}
"#;
        let role = RoleSpec::from_yaml(yaml).unwrap();
        assert_eq!(role.name, "security_reviewer");
        assert_eq!(role.response_key(), "security_reviewer_response");
        assert_eq!(role.placeholders.len(), 2);
    }

    #[test]
    fn test_load_dir_overrides_and_inherits_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("reviewer.yaml"),
            "name: reviewer\nsystem_prompt: \"Job {controlm_job} lint {lint}\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut loader = RoleLoader::new();
        let count = loader.load_dir(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(count, 1);

        let reviewer = loader.resolve("reviewer").unwrap();
        assert_eq!(reviewer.system_prompt, "Job {controlm_job} lint {lint}");
        assert!(reviewer.recognizes("controlm_job"));
        assert!(loader.is_overridden("reviewer"));

        let converter = loader.resolve("converter").unwrap();
        assert_eq!(converter, RoleSpec::converter());
        assert_eq!(loader.all().len(), 2);
        assert!(loader.resolve("nobody").is_none());
    }

    #[test]
    fn test_load_missing_dir() {
        let mut loader = RoleLoader::new();
        assert!(loader.load_dir("/definitely/not/here").is_err());
    }
}
