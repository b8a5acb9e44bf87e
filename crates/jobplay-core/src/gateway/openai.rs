//! OpenAI-compatible gateway, `POST {base_url}/chat/completions`.
//!
//! Works with OpenAI, vLLM, LM Studio, OpenCode/BigModel and anything else
//! that speaks the chat completions format.

use async_trait::async_trait;

use super::{http_client, non_empty, post_json, GatewayConfig, ModelGateway, Payload, RawResponse};
use crate::error::AgentError;

pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl OpenAiGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            base_url: config.base_url(),
            api_key: config.api_key().map(str::to_string),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    fn prepare_payload(&self, user_text: &str, system_prompt: &str) -> Payload {
        let mut messages = vec![];

        if !system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system_prompt
            }));
        }

        messages.push(serde_json::json!({
            "role": "user",
            "content": user_text
        }));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::Value::Number(
                serde_json::Number::from_f64(temp).unwrap_or_else(|| serde_json::Number::from(0)),
            );
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::Value::from(max_tokens);
        }

        Payload { body }
    }

    async fn send(&self, payload: Payload) -> Result<RawResponse, AgentError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("[Gateway] Calling OpenAI-compatible API: {} (model: {})", url, self.model);

        let mut request = self.client.post(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        post_json(self.name(), request, &payload).await
    }

    fn extract_content(&self, response: &RawResponse) -> Result<String, AgentError> {
        let content = response
            .body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                AgentError::malformed(self.name(), "missing 'choices[0].message.content' field")
            })?;
        non_empty(self.name(), "choices[0].message.content", content)
    }
}
