//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and builds its
//! roles, gateway and linter from a shared [`AppContext`].

pub mod batch;
pub mod convert;
pub mod review;
pub mod roles;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jobplay_core::agent::{ConversionRole, ReviewRole, RoleAgent, RoleLoader, RoleSpec, CONVERTER, REVIEWER};
use jobplay_core::feedback::FeedbackLoop;
use jobplay_core::gateway::{build_gateway, ModelGateway};
use jobplay_core::lint::{CommandLinter, Linter, StructureLinter};
use jobplay_core::models::Playbook;
use jobplay_core::prompt::TurnDelimiters;
use jobplay_core::JobplayConfig;

/// How a command finished. Errors are reported separately as `Err(String)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Exit code 0
    Success,
    /// Exit code 2: the review never came back valid
    Unconverged,
}

impl Completion {
    pub fn exit_code(&self) -> i32 {
        match self {
            Completion::Success => 0,
            Completion::Unconverged => 2,
        }
    }
}

/// Configuration plus the role definitions it points at. The gateway is
/// built on first use so offline commands never need credentials.
pub struct AppContext {
    pub config: JobplayConfig,
    pub roles: RoleLoader,
    gateway: Option<Arc<dyn ModelGateway>>,
}

impl AppContext {
    pub fn new(config: JobplayConfig) -> Result<Self, String> {
        let mut roles = RoleLoader::new();
        if let Some(dir) = &config.roles_dir {
            let count = roles.load_dir(dir)?;
            tracing::info!("[Context] Loaded {} role(s) from '{}'", count, dir);
        }
        Ok(Self {
            config,
            roles,
            gateway: None,
        })
    }

    /// Use `gateway` instead of the one described by the configuration.
    pub fn with_gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn gateway(&self) -> Result<Arc<dyn ModelGateway>, String> {
        match &self.gateway {
            Some(gateway) => Ok(gateway.clone()),
            None => build_gateway(&self.config.gateway).map_err(|e| e.to_string()),
        }
    }

    pub fn delimiters(&self) -> Result<TurnDelimiters, String> {
        self.config.turn_delimiters().map_err(|e| e.to_string())
    }

    pub fn role(&self, name: &str) -> Result<RoleSpec, String> {
        self.roles
            .resolve(name)
            .ok_or_else(|| format!("Unknown role '{}'", name))
    }

    pub fn agent(&self, name: &str, gateway: Arc<dyn ModelGateway>) -> Result<RoleAgent, String> {
        Ok(RoleAgent::new(self.role(name)?, gateway, self.delimiters()?))
    }

    /// `--lint-cmd` wins over `lint_command` from the config; without
    /// either the built-in structure linter runs.
    pub fn linter(&self, lint_cmd: Option<&str>, no_lint: bool) -> Option<Arc<dyn Linter>> {
        if no_lint {
            return None;
        }
        let linter: Arc<dyn Linter> = match lint_cmd.or(self.config.lint_command.as_deref()) {
            Some(cmd) if !cmd.trim().is_empty() => Arc::new(CommandLinter::new(cmd)),
            _ => Arc::new(StructureLinter),
        };
        Some(linter)
    }

    pub fn feedback_loop(
        &self,
        max_attempts: Option<u32>,
        lint_cmd: Option<&str>,
        no_lint: bool,
    ) -> Result<FeedbackLoop, String> {
        let gateway = self.gateway()?;
        let converter = ConversionRole::new(self.agent(CONVERTER, gateway.clone())?);
        let reviewer = ReviewRole::new(self.agent(REVIEWER, gateway)?);

        let mut config = self.config.loop_config();
        if let Some(max) = max_attempts {
            config.max_attempts = max;
        }

        let mut flow = FeedbackLoop::new(converter, reviewer).with_config(config);
        if let Some(linter) = self.linter(lint_cmd, no_lint) {
            flow = flow.with_linter(linter);
        }
        Ok(flow)
    }
}

/// Load `.env` files, the config file and environment overrides.
pub fn init_context(config_path: Option<&str>) -> Result<AppContext, String> {
    load_dotenv();
    let mut config = JobplayConfig::discover(config_path).map_err(|e| e.to_string())?;
    config.apply_env_overrides().map_err(|e| e.to_string())?;
    AppContext::new(config)
}

/// Dotenv files in precedence order. Variables already in the environment
/// win over both.
const DOTENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Load `.env.local` and `.env` from the working directory, typically
/// holding `JOBPLAY_API_KEY` and friends.
pub fn load_dotenv() {
    load_dotenv_in(Path::new("."));
}

/// Returns the files that were read.
pub fn load_dotenv_in(dir: &Path) -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    for name in DOTENV_FILES {
        let path = dir.join(name);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let mut applied = 0;
        for (key, value) in parse_dotenv(&content) {
            if std::env::var_os(&key).is_none() {
                std::env::set_var(&key, value);
                applied += 1;
            }
        }
        tracing::debug!("[jobplay] {} variable(s) set from {}", applied, path.display());
        loaded.push(path);
    }
    loaded
}

/// `KEY=value` pairs from dotenv text. Accepts an `export ` prefix and
/// quoted values; unquoted values end at ` #`.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, raw) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return None;
            }
            Some((key.to_string(), dotenv_value(raw.trim())))
        })
        .collect()
}

fn dotenv_value(raw: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}

/// Read a file, or stdin when `path` is `-`.
pub fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

/// Playbook text as written to disk: normalized YAML when the model output
/// parses, the raw text otherwise.
pub fn playbook_file_text(raw: &str) -> String {
    match Playbook::parse(raw).and_then(|p| {
        p.to_yaml()
            .map_err(jobplay_core::error::OutputError::Unparseable)
    }) {
        Ok(yaml) => yaml,
        Err(_) => format!("{}\n", raw.trim_end()),
    }
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
