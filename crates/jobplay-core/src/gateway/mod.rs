//! Model gateways: the inference backends a role agent talks to.
//!
//! A gateway does three things, always in this order for one invocation:
//!
//! ```text
//! prepare_payload(user, system) ──► send(payload) ──► extract_content(raw)
//! ```
//!
//! `send` is the only network call. It is made exactly once per role
//! invocation; retries, if wanted, belong to the caller.

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod scripted;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, ConfigError};

pub use anthropic::AnthropicGateway;
pub use ollama::OllamaGateway;
pub use openai::OpenAiGateway;
pub use scripted::{ScriptedGateway, ScriptedReply};

/// Request body ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub body: serde_json::Value,
}

/// Decoded response body plus HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn prepare_payload(&self, user_text: &str, system_prompt: &str) -> Payload;

    async fn send(&self, payload: Payload) -> Result<RawResponse, AgentError>;

    /// Generated text without transport metadata. Missing or empty content
    /// is a `MalformedResponse`.
    fn extract_content(&self, response: &RawResponse) -> Result<String, AgentError>;
}

/// Backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// Ollama `/api/generate`
    #[default]
    Ollama,
    /// OpenAI-compatible `/chat/completions`
    #[serde(alias = "opencode", alias = "openai-compatible")]
    OpenAi,
    /// Anthropic Messages API `/v1/messages`
    #[serde(alias = "claude")]
    Anthropic,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    /// Ollama receives raw prompts, so it needs model header tokens.
    pub fn default_delimiters(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3",
            Self::OpenAi | Self::Anthropic => "plain",
        }
    }
}

/// Connection settings for a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    /// Defaults to the kind's public endpoint
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    /// Ollama only: send the prompt verbatim, bypassing the model template
    pub raw: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Ollama,
            base_url: None,
            model: "llama3.1".to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: 300,
            raw: true,
        }
    }
}

impl GatewayConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Build the gateway described by `config`.
pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>, ConfigError> {
    let gateway: Arc<dyn ModelGateway> = match config.kind {
        GatewayKind::Ollama => Arc::new(OllamaGateway::new(config)),
        GatewayKind::OpenAi => Arc::new(OpenAiGateway::new(config)),
        GatewayKind::Anthropic => {
            if config.api_key().is_none() {
                return Err(ConfigError::MissingApiKey(config.kind.as_str().to_string()));
            }
            Arc::new(AnthropicGateway::new(config))
        }
    };
    Ok(gateway)
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// POST a JSON body and decode the JSON answer.
///
/// Network failures and non-2xx statuses are transport errors; a 2xx body
/// that is not JSON is a malformed response.
pub(crate) async fn post_json(
    gateway: &str,
    request: reqwest::RequestBuilder,
    payload: &Payload,
) -> Result<RawResponse, AgentError> {
    let response = request
        .header("content-type", "application/json")
        .json(&payload.body)
        .send()
        .await
        .map_err(|e| AgentError::transport(gateway, format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AgentError::transport(gateway, format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(AgentError::transport(
            gateway,
            format!("API returned {}: {}", status, truncate(&text, 500)),
        ));
    }

    let body = serde_json::from_str(&text)
        .map_err(|e| AgentError::malformed(gateway, format!("Response is not JSON: {}", e)))?;

    Ok(RawResponse {
        status: status.as_u16(),
        body,
    })
}

/// Reject empty generations; a model that produced nothing has not answered.
pub(crate) fn non_empty(gateway: &str, field: &str, content: &str) -> Result<String, AgentError> {
    if content.trim().is_empty() {
        return Err(AgentError::malformed(gateway, format!("'{}' is empty", field)));
    }
    Ok(content.to_string())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
