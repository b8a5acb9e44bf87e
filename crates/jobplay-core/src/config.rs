//! `jobplay.yaml` configuration.
//!
//! ```yaml
//! gateway:
//!   kind: ollama            # ollama | openai | anthropic
//!   base_url: ${OLLAMA_HOST:-http://localhost:11434}
//!   model: llama3.1
//!   temperature: 0.2
//! delimiters: llama3        # llama3 | chatml | plain, or explicit tokens
//! max_attempts: 3
//! precheck_structure: true
//! roles_dir: ./roles
//! lint_command: ansible-lint --nocolor
//! concurrency: 4
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are expanded before parsing. Environment
//! variables `JOBPLAY_GATEWAY`, `JOBPLAY_BASE_URL`, `JOBPLAY_MODEL` and
//! `JOBPLAY_API_KEY` override the file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::feedback::LoopConfig;
use crate::gateway::{GatewayConfig, GatewayKind};
use crate::prompt::TurnDelimiters;

pub const CONFIG_FILE_NAMES: &[&str] = &["jobplay.yaml", "jobplay.yml"];

/// Either a preset name or explicit tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelimiterSetting {
    Preset(String),
    Custom(TurnDelimiters),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobplayConfig {
    pub gateway: GatewayConfig,
    /// Defaults to the gateway kind's preset
    pub delimiters: Option<DelimiterSetting>,
    pub max_attempts: u32,
    pub precheck_structure: bool,
    pub roles_dir: Option<String>,
    pub lint_command: Option<String>,
    pub concurrency: usize,
}

impl Default for JobplayConfig {
    fn default() -> Self {
        let loop_defaults = LoopConfig::default();
        Self {
            gateway: GatewayConfig::default(),
            delimiters: None,
            max_attempts: loop_defaults.max_attempts,
            precheck_structure: loop_defaults.precheck_structure,
            roles_dir: None,
            lint_command: None,
            concurrency: 4,
        }
    }
}

impl JobplayConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = resolve_env_vars(yaml);
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load `explicit` if given; otherwise the first of `./jobplay.yaml`,
    /// `./jobplay.yml` and `<config dir>/jobplay/config.yaml` that exists;
    /// otherwise defaults.
    pub fn discover(explicit: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(Path::new(path));
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                tracing::info!("[Config] Using {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }

        tracing::debug!("[Config] No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(PathBuf::from).collect();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("jobplay").join("config.yaml"));
        }
        paths
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = lookup("JOBPLAY_GATEWAY") {
            self.gateway.kind = parse_gateway_kind(&kind)?;
        }
        if let Some(url) = lookup("JOBPLAY_BASE_URL") {
            self.gateway.base_url = Some(url);
        }
        if let Some(model) = lookup("JOBPLAY_MODEL") {
            self.gateway.model = model;
        }
        if let Some(key) = lookup("JOBPLAY_API_KEY") {
            self.gateway.api_key = Some(key);
        }
        Ok(())
    }

    pub fn turn_delimiters(&self) -> Result<TurnDelimiters, ConfigError> {
        match &self.delimiters {
            Some(DelimiterSetting::Custom(delimiters)) => Ok(delimiters.clone()),
            Some(DelimiterSetting::Preset(name)) => TurnDelimiters::preset(name)
                .ok_or_else(|| ConfigError::UnknownDelimiters(name.clone())),
            None => {
                let name = self.gateway.kind.default_delimiters();
                TurnDelimiters::preset(name)
                    .ok_or_else(|| ConfigError::UnknownDelimiters(name.to_string()))
            }
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_attempts: self.max_attempts,
            precheck_structure: self.precheck_structure,
        }
    }
}

pub fn parse_gateway_kind(value: &str) -> Result<GatewayKind, ConfigError> {
    serde_yaml::from_str(value.trim())
        .map_err(|_| ConfigError::Parse(format!("unknown gateway kind '{}'", value)))
}

/// Expand `${VAR}` and `${VAR:-default}` from the process environment.
pub fn resolve_env_vars(input: &str) -> String {
    expand_vars(input, |name| std::env::var(name).ok())
}

/// Expand placeholders through `lookup`. As in the shell, `:-` also applies
/// when the variable is set but empty. Unset variables without a default
/// are left as written so the YAML error points at them.
pub fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::-(?P<default>[^}]*))?\}")
            .expect("valid env var regex")
    });

    re.replace_all(input, |caps: &regex::Captures| {
        match (lookup(&caps["name"]), caps.name("default")) {
            (Some(value), Some(default)) if value.is_empty() => default.as_str().to_string(),
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => caps[0].to_string(),
        }
    })
    .into_owned()
}
