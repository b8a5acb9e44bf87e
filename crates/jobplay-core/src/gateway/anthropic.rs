//! Anthropic Messages API gateway, `POST {base_url}/v1/messages`.

use async_trait::async_trait;

use super::{http_client, non_empty, post_json, GatewayConfig, ModelGateway, Payload, RawResponse};
use crate::error::AgentError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

pub struct AnthropicGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: u32,
}

impl AnthropicGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            base_url: config.base_url(),
            api_key: config.api_key().unwrap_or_default().to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn prepare_payload(&self, user_text: &str, system_prompt: &str) -> Payload {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": user_text
                }
            ]
        });

        if !system_prompt.is_empty() {
            body["system"] = serde_json::Value::String(system_prompt.to_string());
        }

        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::Value::Number(
                serde_json::Number::from_f64(temp).unwrap_or_else(|| serde_json::Number::from(0)),
            );
        }

        Payload { body }
    }

    async fn send(&self, payload: Payload) -> Result<RawResponse, AgentError> {
        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!("[Gateway] Calling Anthropic API: {} (model: {})", url, self.model);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        post_json(self.name(), request, &payload).await
    }

    /// Text blocks are joined with newlines; other block types are ignored.
    fn extract_content(&self, response: &RawResponse) -> Result<String, AgentError> {
        let blocks = response
            .body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| AgentError::malformed(self.name(), "missing 'content' field"))?;

        let content = blocks
            .iter()
            .filter_map(|block| {
                if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                    block.get("text").and_then(|t| t.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        non_empty(self.name(), "content[].text", &content)
    }
}
