//! Scripted gateway: replays canned replies and records every request.
//!
//! Used to drive role agents and the feedback loop without a model server.
//! Replies are consumed in order; once the script runs out the last reply
//! repeats.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ModelGateway, Payload, RawResponse};
use crate::error::AgentError;

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// A well-formed answer with this generated text
    Content(String),
    /// An arbitrary response body (e.g. one without a content field)
    Body(serde_json::Value),
    /// A transport failure with this message
    TransportError(String),
}

/// A request as the gateway saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_text: String,
}

pub struct ScriptedGateway {
    name: String,
    script: Mutex<VecDeque<ScriptedReply>>,
    last: Mutex<Option<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Gateway that answers every request with `content`.
    pub fn always(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name).then(ScriptedReply::Content(content.into()))
    }

    pub fn then(self, reply: ScriptedReply) -> Self {
        lock(&self.script).push_back(reply);
        self
    }

    pub fn then_content(self, content: impl Into<String>) -> Self {
        self.then(ScriptedReply::Content(content.into()))
    }

    /// Number of `send` calls made so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let mut script = lock(&self.script);
        let mut last = lock(&self.last);
        if let Some(reply) = script.pop_front() {
            *last = Some(reply.clone());
            return Some(reply);
        }
        last.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare_payload(&self, user_text: &str, system_prompt: &str) -> Payload {
        Payload {
            body: serde_json::json!({
                "system": system_prompt,
                "prompt": user_text,
            }),
        }
    }

    async fn send(&self, payload: Payload) -> Result<RawResponse, AgentError> {
        let field = |key: &str| {
            payload
                .body
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        lock(&self.calls).push(RecordedCall {
            system_prompt: field("system"),
            user_text: field("prompt"),
        });

        match self.next_reply() {
            Some(ScriptedReply::Content(content)) => Ok(RawResponse {
                status: 200,
                body: serde_json::json!({ "response": content }),
            }),
            Some(ScriptedReply::Body(body)) => Ok(RawResponse { status: 200, body }),
            Some(ScriptedReply::TransportError(message)) => {
                Err(AgentError::transport(&self.name, message))
            }
            None => Err(AgentError::transport(&self.name, "script exhausted")),
        }
    }

    fn extract_content(&self, response: &RawResponse) -> Result<String, AgentError> {
        response
            .body
            .get("response")
            .and_then(|r| r.as_str())
            .map(str::to_string)
            .ok_or_else(|| AgentError::malformed(&self.name, "missing 'response' field"))
    }
}
