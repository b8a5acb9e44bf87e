//! Ollama gateway, `POST {base_url}/api/generate` with `stream: false`.
//!
//! In raw mode the system prompt and the user turn are concatenated into a
//! single prompt and Ollama's own chat template is bypassed, so the turn
//! delimiters configured on the role agent reach the model verbatim.

use async_trait::async_trait;

use super::{http_client, non_empty, post_json, GatewayConfig, ModelGateway, Payload, RawResponse};
use crate::error::AgentError;

pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f64>,
    raw: bool,
}

impl OllamaGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            base_url: config.base_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            raw: config.raw,
        }
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    fn name(&self) -> &str {
        "ollama"
    }

    fn prepare_payload(&self, user_text: &str, system_prompt: &str) -> Payload {
        let mut body = if self.raw {
            serde_json::json!({
                "model": self.model,
                "prompt": format!("{}{}", system_prompt, user_text),
                "raw": true,
                "stream": false,
            })
        } else {
            serde_json::json!({
                "model": self.model,
                "prompt": user_text,
                "system": system_prompt,
                "stream": false,
            })
        };

        if let Some(temp) = self.temperature {
            body["options"] = serde_json::json!({ "temperature": temp });
        }

        Payload { body }
    }

    async fn send(&self, payload: Payload) -> Result<RawResponse, AgentError> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!("[Gateway] Calling Ollama: {} (model: {})", url, self.model);
        post_json(self.name(), self.client.post(&url), &payload).await
    }

    fn extract_content(&self, response: &RawResponse) -> Result<String, AgentError> {
        let content = response
            .body
            .get("response")
            .and_then(|r| r.as_str())
            .ok_or_else(|| AgentError::malformed(self.name(), "missing 'response' field"))?;
        non_empty(self.name(), "response", content)
    }
}
