//! Error and warning types for the jobplay core.
//!
//! Hard failures (`AgentError`, `SessionError`) stop a conversion session.
//! Content-quality problems are `Warning`s: they are recorded on the attempt
//! and recovered by the feedback loop.

use serde::{Deserialize, Serialize};

/// Failure of a single role invocation.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A placeholder the role recognizes is used by the template but no value was given.
    #[error("Template render error in role '{role}': no value for placeholder '{{{placeholder}}}'")]
    TemplateRender { role: String, placeholder: String },

    /// The gateway call itself failed (network, HTTP status, auth, rate limit).
    #[error("Gateway transport error ({gateway}): {message}")]
    GatewayTransport { gateway: String, message: String },

    /// The gateway answered but the expected content field is missing or empty.
    #[error("Malformed response from {gateway}: {message}")]
    MalformedResponse { gateway: String, message: String },
}

impl AgentError {
    pub fn transport(gateway: &str, message: impl Into<String>) -> Self {
        Self::GatewayTransport {
            gateway: gateway.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(gateway: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            gateway: gateway.to_string(),
            message: message.into(),
        }
    }
}

/// Failure that halts a feedback-loop session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Role '{role}' failed on attempt {attempt}: {source}")]
    Agent {
        role: String,
        attempt: u32,
        #[source]
        source: AgentError,
    },

    #[error("Session cancelled before {stage} on attempt {attempt}")]
    Cancelled { stage: String, attempt: u32 },

    #[error("Session task failed: {0}")]
    Join(String),
}

impl SessionError {
    /// Role name and attempt number of an agent failure.
    pub fn failed_role(&self) -> Option<(&str, u32)> {
        match self {
            Self::Agent { role, attempt, .. } => Some((role.as_str(), *attempt)),
            _ => None,
        }
    }
}

/// Soft, non-fatal conditions observed during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Model output did not parse as JSON or YAML.
    UnstructuredOutput { stage: String, message: String },
    /// The reviewer said "valid" but still listed improvements.
    ValidWithImprovements { count: usize },
    /// The linter collaborator could not run.
    LintUnavailable { linter: String, message: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnstructuredOutput { stage, message } => {
                write!(f, "unstructured {} output: {}", stage, message)
            }
            Warning::ValidWithImprovements { count } => {
                write!(f, "verdict is valid but lists {} improvement(s)", count)
            }
            Warning::LintUnavailable { linter, message } => {
                write!(f, "linter '{}' unavailable: {}", linter, message)
            }
        }
    }
}

/// Failure parsing model output into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    #[error("Output is empty")]
    Empty,

    #[error("Output is neither JSON nor YAML: {0}")]
    Unparseable(String),

    #[error("Output parsed but is not a playbook: {0}")]
    NotAPlaybook(String),
}

/// Configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Unknown turn delimiter preset '{0}'")]
    UnknownDelimiters(String),

    #[error("Gateway '{0}' requires an API key")]
    MissingApiKey(String),

    #[error("Role error: {0}")]
    Role(String),
}

/// Linter collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error("Linter command is empty")]
    EmptyCommand,

    #[error("Failed to run linter '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the deterministic job → playbook mapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("Job '{0}' has no command")]
    MissingCommand(String),

    #[error("Invalid time of day '{0}' (expected HH:MM)")]
    InvalidTime(String),

    #[error("Invalid retry delay '{0}'")]
    InvalidDelay(String),

    #[error("Unsupported schedule: {0}")]
    InvalidSchedule(String),
}
