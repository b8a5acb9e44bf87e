//! Chat-turn delimiters wrapped around the system prompt and the user turn.
//!
//! Backends that take raw completion prompts (Ollama with `raw: true`)
//! need the model's own header tokens; chat-style APIs need none. The
//! delimiters are therefore configuration, with presets for common
//! model families.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TurnDelimiters {
    pub system_start: String,
    pub system_end: String,
    pub user_start: String,
    pub user_end: String,
    pub assistant_start: String,
}

impl TurnDelimiters {
    /// Llama 3 header tokens.
    pub fn llama3() -> Self {
        Self {
            system_start: "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n"
                .to_string(),
            system_end: "<|eot_id|>".to_string(),
            user_start: "<|start_header_id|>user<|end_header_id|>\n\n".to_string(),
            user_end: "<|eot_id|>".to_string(),
            assistant_start: "<|start_header_id|>assistant<|end_header_id|>\n\n".to_string(),
        }
    }

    /// ChatML (`<|im_start|>` / `<|im_end|>`).
    pub fn chatml() -> Self {
        Self {
            system_start: "<|im_start|>system\n".to_string(),
            system_end: "<|im_end|>\n".to_string(),
            user_start: "<|im_start|>user\n".to_string(),
            user_end: "<|im_end|>\n".to_string(),
            assistant_start: "<|im_start|>assistant\n".to_string(),
        }
    }

    /// No markers; for APIs that carry roles in the request structure.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "llama3" | "llama-3" | "llama" => Some(Self::llama3()),
            "chatml" => Some(Self::chatml()),
            "plain" | "none" => Some(Self::plain()),
            _ => None,
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::plain()
    }

    pub fn wrap_system(&self, system_prompt: &str) -> String {
        if self.is_plain() {
            return system_prompt.to_string();
        }
        format!(
            "{}{}{}",
            self.system_start,
            system_prompt.trim(),
            self.system_end
        )
    }

    /// User turn followed by the assistant marker the model continues from.
    pub fn wrap_user(&self, task_input: &str) -> String {
        if self.is_plain() {
            return task_input.to_string();
        }
        format!(
            "{}{}{}\n{}",
            self.user_start, task_input, self.user_end, self.assistant_start
        )
    }
}
