//! Role agent: one role, one model round trip.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::RoleSpec;
use crate::error::AgentError;
use crate::gateway::ModelGateway;
use crate::prompt::{PromptVars, TurnDelimiters};

/// A role's output, labelled `"{role}_response"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role_name: String,
    pub content: String,
}

impl RoleResponse {
    pub fn key(&self) -> String {
        format!("{}_response", self.role_name)
    }

    pub fn into_entry(self) -> (String, String) {
        (self.key(), self.content)
    }
}

/// Merge several role outputs into one map keyed by `"{role}_response"`.
pub fn merge_responses(responses: impl IntoIterator<Item = RoleResponse>) -> BTreeMap<String, String> {
    responses.into_iter().map(RoleResponse::into_entry).collect()
}

/// Binds a [`RoleSpec`] to a gateway. Stateless between calls and cheap to clone.
#[derive(Clone)]
pub struct RoleAgent {
    spec: RoleSpec,
    gateway: Arc<dyn ModelGateway>,
    delimiters: TurnDelimiters,
    clock: fn() -> DateTime<Utc>,
}

impl RoleAgent {
    pub fn new(spec: RoleSpec, gateway: Arc<dyn ModelGateway>, delimiters: TurnDelimiters) -> Self {
        Self {
            spec,
            gateway,
            delimiters,
            clock: Utc::now,
        }
    }

    /// Replace the clock used for `{datetime}`.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn spec(&self) -> &RoleSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }

    /// Render the system prompt. `{datetime}` is filled in unless `vars` sets it.
    pub fn render_system_prompt(&self, vars: &PromptVars) -> Result<String, AgentError> {
        self.spec.render_at(vars, (self.clock)())
    }

    /// Run the role once on `task_input`.
    ///
    /// Rendering happens before anything is sent, so a template error never
    /// reaches the gateway.
    pub async fn perform(&self, task_input: &str, vars: &PromptVars) -> Result<RoleResponse, AgentError> {
        let system_prompt = self.delimiters.wrap_system(&self.render_system_prompt(vars)?);
        let user_prompt = self.delimiters.wrap_user(task_input);

        let payload = self.gateway.prepare_payload(&user_prompt, &system_prompt);
        tracing::debug!(
            "[RoleAgent] {} → {} (system: {} chars, user: {} chars)",
            self.spec.name,
            self.gateway.name(),
            system_prompt.len(),
            user_prompt.len()
        );

        let raw = self.gateway.send(payload).await?;
        let content = self.gateway.extract_content(&raw)?;

        tracing::info!(
            "[RoleAgent] {} responded ({} chars)",
            self.spec.name,
            content.len()
        );

        Ok(RoleResponse {
            role_name: self.spec.name.clone(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ScriptedGateway, ScriptedReply};
    use chrono::TimeZone;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn agent(spec: RoleSpec, gateway: Arc<ScriptedGateway>) -> RoleAgent {
        RoleAgent::new(spec, gateway, TurnDelimiters::plain()).with_clock(fixed_clock)
    }

    #[tokio::test]
    async fn test_response_key_uses_role_name() {
        for name in ["converter", "review_agent", "a_b_c"] {
            let gateway = Arc::new(ScriptedGateway::always("stub", "ok"));
            let spec = RoleSpec::new(name, "prompt", &[]);
            let response = agent(spec, gateway).perform("task", &PromptVars::new()).await.unwrap();
            assert_eq!(response.key(), format!("{}_response", name));
            assert_eq!(response.content, "ok");
        }
    }

    #[tokio::test]
    async fn test_template_error_makes_no_gateway_call() {
        let gateway = Arc::new(ScriptedGateway::always("stub", "ok"));
        let spec = RoleSpec::new("reviewer", "Job: {controlm_job}", &["controlm_job"]);
        let err = agent(spec, gateway.clone())
            .perform("task", &PromptVars::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::TemplateRender { .. }));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_datetime_is_supplied() {
        let gateway = Arc::new(ScriptedGateway::always("stub", "ok"));
        let spec = RoleSpec::new("r", "Today: {datetime}", &["datetime"]);
        agent(spec, gateway.clone()).perform("task", &PromptVars::new()).await.unwrap();
        assert_eq!(gateway.calls()[0].system_prompt, "Today: 2024-05-01 12:30:00 UTC");
    }

    #[tokio::test]
    async fn test_delimiters_wrap_user_turn() {
        let gateway = Arc::new(ScriptedGateway::always("stub", "ok"));
        let spec = RoleSpec::new("r", "sys", &[]);
        RoleAgent::new(spec, gateway.clone(), TurnDelimiters::llama3())
            .perform("JOB", &PromptVars::new())
            .await
            .unwrap();
        let call = &gateway.calls()[0];
        assert!(call.user_text.contains("user<|end_header_id|>\n\nJOB<|eot_id|>"));
        assert!(call.user_text.ends_with("assistant<|end_header_id|>\n\n"));
        assert!(call.system_prompt.starts_with("<|begin_of_text|>"));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let gateway = Arc::new(
            ScriptedGateway::new("stub").then(ScriptedReply::Body(serde_json::json!({"done": true}))),
        );
        let err = agent(RoleSpec::new("r", "sys", &[]), gateway)
            .perform("task", &PromptVars::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse { .. }));
    }

    #[test]
    fn test_merge_responses() {
        let merged = merge_responses(vec![
            RoleResponse { role_name: "converter".into(), content: "a".into() },
            RoleResponse { role_name: "reviewer".into(), content: "b".into() },
        ]);
        assert_eq!(merged["converter_response"], "a");
        assert_eq!(merged["reviewer_response"], "b");
    }
}
