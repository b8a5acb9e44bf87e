//! Ansible playbook shape produced by the conversion role.
//!
//! ```yaml
//! - name: Run data backup job
//!   hosts: localhost
//!   become: true
//!   vars: {}
//!   tasks:
//!     - name: Run backup script
//!       ansible.builtin.shell: /usr/local/bin/backup.sh
//!   handlers: []
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OutputError;
use crate::models::output::parse_structured;

/// An ordered list of plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Playbook {
    pub plays: Vec<Play>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<HostPattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#become: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, Value>,

    /// Required so that stray mappings (`Note: ...`, `{"error": ...}`) are not
    /// mistaken for plays.
    pub tasks: Vec<Task>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<Task>,
}

/// `hosts:` accepts a single pattern or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostPattern {
    One(String),
    Many(Vec<String>),
}

impl HostPattern {
    pub fn is_empty(&self) -> bool {
        match self {
            HostPattern::One(s) => s.trim().is_empty(),
            HostPattern::Many(list) => list.iter().all(|s| s.trim().is_empty()),
        }
    }
}

/// A task or handler. The module call and its keywords stay free-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub body: BTreeMap<String, Value>,
}

impl Task {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            body: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    /// Look up a module argument by short or fully-qualified name
    /// (`shell` matches `ansible.builtin.shell`).
    pub fn module(&self, short_name: &str) -> Option<&Value> {
        let fqcn = format!("ansible.builtin.{}", short_name);
        self.body.get(short_name).or_else(|| self.body.get(&fqcn))
    }
}

/// Accept both a list of plays and a single play object.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlaybookShape {
    Plays(Vec<Play>),
    Single(Play),
}

impl Playbook {
    /// Parse model output (JSON or YAML, optionally fenced) into a playbook.
    pub fn parse(text: &str) -> Result<Self, OutputError> {
        let plays = match parse_structured::<PlaybookShape>(text)? {
            PlaybookShape::Plays(plays) => plays,
            PlaybookShape::Single(play) => vec![play],
        };
        if plays.is_empty() {
            return Err(OutputError::NotAPlaybook("no plays".to_string()));
        }
        Ok(Self { plays })
    }

    /// Shape problems the linter and reviewer should hear about.
    pub fn structural_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.plays.is_empty() {
            issues.push("Playbook contains no plays".to_string());
        }

        for (i, play) in self.plays.iter().enumerate() {
            let label = if play.name.trim().is_empty() {
                format!("play #{}", i + 1)
            } else {
                format!("play '{}'", play.name)
            };

            if play.name.trim().is_empty() {
                issues.push(format!("{} has no name", label));
            }
            if play.hosts.as_ref().map_or(true, HostPattern::is_empty) {
                issues.push(format!("{} has no hosts", label));
            }
            if play.tasks.is_empty() {
                issues.push(format!("{} has no tasks", label));
            }
            for (j, task) in play.tasks.iter().enumerate() {
                if task.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                    issues.push(format!("{} task #{} has no name", label, j + 1));
                }
                if task.body.is_empty() {
                    issues.push(format!("{} task #{} calls no module", label, j + 1));
                }
            }
        }

        issues
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.plays.iter().flat_map(|p| p.tasks.iter())
    }

    pub fn to_yaml(&self) -> Result<String, String> {
        serde_yaml::to_string(self).map_err(|e| format!("Failed to serialize playbook: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_playbook() {
        let yaml = r#"
- name: Run data cleanup job
  hosts: localhost
  become: true
  tasks:
    - name: Run cleanup script
      shell: /usr/local/bin/cleanup.sh
      environment:
        CLEANUP_DIR: /data/cleanup
      retries: 3
      delay: 300
"#;
        let playbook = Playbook::parse(yaml).unwrap();
        assert_eq!(playbook.plays.len(), 1);
        let play = &playbook.plays[0];
        assert_eq!(play.r#become, Some(true));
        assert_eq!(play.hosts, Some(HostPattern::One("localhost".to_string())));
        let task = &play.tasks[0];
        assert_eq!(task.module("shell").unwrap(), "/usr/local/bin/cleanup.sh");
        assert_eq!(task.body["retries"], 3);
        assert!(playbook.structural_issues().is_empty());
    }

    #[test]
    fn test_parse_fenced_json_single_play() {
        let text = "```json\n{\"name\": \"p\", \"hosts\": [\"web\"], \"tasks\": [{\"name\": \"t\", \"ansible.builtin.command\": \"true\"}]}\n```";
        let playbook = Playbook::parse(text).unwrap();
        assert_eq!(playbook.plays.len(), 1);
        assert!(playbook.tasks().next().unwrap().module("command").is_some());
    }

    #[test]
    fn test_prose_is_not_a_playbook() {
        assert!(Playbook::parse("I could not convert this job, sorry.").is_err());
    }

    #[test]
    fn test_mappings_without_tasks_are_not_plays() {
        assert!(Playbook::parse("Sure: I could not convert this job.").is_err());
        assert!(Playbook::parse(r#"{"error": "model overloaded"}"#).is_err());
        assert!(Playbook::parse("- Note: nothing to convert").is_err());
    }

    #[test]
    fn test_empty_list_is_not_a_playbook() {
        assert_eq!(
            Playbook::parse("[]").unwrap_err(),
            OutputError::NotAPlaybook("no plays".to_string())
        );
    }

    #[test]
    fn test_structural_issues() {
        let playbook = Playbook::parse(r#"[{"name": "", "tasks": [{"name": "x"}]}]"#).unwrap();
        let issues = playbook.structural_issues();
        assert!(issues.iter().any(|i| i.contains("has no name")));
        assert!(issues.iter().any(|i| i.contains("has no hosts")));
        assert!(issues.iter().any(|i| i.contains("calls no module")));

        assert_eq!(
            Playbook::default().structural_issues(),
            vec!["Playbook contains no plays".to_string()]
        );
    }

    #[test]
    fn test_become_serializes_without_raw_prefix() {
        let playbook = Playbook {
            plays: vec![Play {
                name: "p".into(),
                hosts: Some(HostPattern::One("all".into())),
                r#become: Some(true),
                vars: BTreeMap::new(),
                tasks: vec![Task::named("t").with("command", "true")],
                handlers: vec![],
            }],
        };
        let yaml = playbook.to_yaml().unwrap();
        assert!(yaml.contains("become: true"));
        assert!(!yaml.contains("handlers"));
    }
}
