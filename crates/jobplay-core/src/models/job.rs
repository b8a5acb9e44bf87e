//! Control-M job definition.
//!
//! Only the fields the converter cares about are typed; anything else the
//! scheduler exported is kept in `extra` so the job re-serializes into the
//! prompt without losing information.
//!
//! ```json
//! {
//!   "job_name": "data_backup",
//!   "command": "/usr/local/bin/backup.sh",
//!   "schedule": { "type": "daily", "time": "02:00" },
//!   "environment_variables": { "BACKUP_DIR": "/data/backup" },
//!   "retry": { "count": 3, "delay": "5m" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MappingError;

/// A scheduled job exported from Control-M.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    #[serde(alias = "JobName", alias = "name")]
    pub job_name: String,

    #[serde(default, alias = "Command", skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment_variables: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,

    /// Names of jobs that must complete first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// When the job runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schedule {
    /// daily, hourly, weekly, monthly or cron
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Time of day, `HH:MM` or `HHMM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Weekday for weekly schedules, day of month for monthly ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,

    /// Five-field cron expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelaySpec>,
}

/// Retry delay as written in the job: bare seconds or a suffixed string like `"5m"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelaySpec {
    Seconds(u64),
    Text(String),
}

impl DelaySpec {
    pub fn to_seconds(&self) -> Result<u64, MappingError> {
        match self {
            DelaySpec::Seconds(secs) => Ok(*secs),
            DelaySpec::Text(text) => parse_delay_secs(text),
        }
    }
}

/// Normalize a delay such as `"30s"`, `"5m"`, `"2h"`, `"1d"` or `"45"` to seconds.
pub fn parse_delay_secs(text: &str) -> Result<u64, MappingError> {
    let trimmed = text.trim().to_lowercase();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| MappingError::InvalidDelay(text.to_string()))?;

    let multiplier = match unit.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86_400,
        _ => return Err(MappingError::InvalidDelay(text.to_string())),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| MappingError::InvalidDelay(text.to_string()))
}

impl JobDefinition {
    /// Parse a job definition from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse job JSON: {}", e))
    }

    /// Load a job definition from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read job file '{}': {}", path, e))?;
        Self::from_json(&content)
    }

    /// Pretty JSON used as prompt input.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Environment variables rendered as strings (numbers and booleans included).
    pub fn environment(&self) -> BTreeMap<String, String> {
        self.environment_variables
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}
