use std::sync::Arc;

use super::role::RoleSpec;
use super::role_agent::RoleAgent;
use crate::error::AgentError;
use crate::gateway::ModelGateway;
use crate::prompt::placeholders::FEEDBACK;
use crate::prompt::{PromptVars, TurnDelimiters};

/// Turns a job definition into playbook text.
///
/// The returned text is whatever the model produced; validating it is the
/// job of the linter and the review role.
#[derive(Clone)]
pub struct ConversionRole {
    agent: RoleAgent,
}

impl ConversionRole {
    pub fn new(agent: RoleAgent) -> Self {
        Self { agent }
    }

    /// Built-in converter prompt on `gateway`.
    pub fn builtin(gateway: Arc<dyn ModelGateway>, delimiters: TurnDelimiters) -> Self {
        Self::new(RoleAgent::new(RoleSpec::converter(), gateway, delimiters))
    }

    pub fn agent(&self) -> &RoleAgent {
        &self.agent
    }

    /// `feedback` goes into `{feedback}` verbatim; an empty string is fine.
    pub async fn convert(&self, job_json: &str, feedback: &str) -> Result<String, AgentError> {
        let vars = Self::vars(feedback);
        let response = self.agent.perform(job_json, &vars).await?;
        Ok(response.content)
    }

    pub fn vars(feedback: &str) -> PromptVars {
        let mut vars = PromptVars::new();
        vars.insert(FEEDBACK.to_string(), feedback.to_string());
        vars
    }
}
