use std::sync::Arc;

use super::role::RoleSpec;
use super::role_agent::RoleAgent;
use crate::error::{AgentError, OutputError};
use crate::gateway::ModelGateway;
use crate::models::ReviewVerdict;
use crate::prompt::placeholders::{CONTROLM_JOB, LINT};
use crate::prompt::{PromptVars, TurnDelimiters};

/// Judges a playbook against the job it was generated from.
#[derive(Clone)]
pub struct ReviewRole {
    agent: RoleAgent,
}

impl ReviewRole {
    pub fn new(agent: RoleAgent) -> Self {
        Self { agent }
    }

    /// Built-in reviewer prompt on `gateway`.
    pub fn builtin(gateway: Arc<dyn ModelGateway>, delimiters: TurnDelimiters) -> Self {
        Self::new(RoleAgent::new(RoleSpec::reviewer(), gateway, delimiters))
    }

    pub fn agent(&self) -> &RoleAgent {
        &self.agent
    }

    /// The job goes into `{controlm_job}`, lint output into `{lint}`, and the
    /// playbook is the task input. Returns the reviewer's raw text.
    pub async fn review(
        &self,
        job_json: &str,
        playbook_text: &str,
        lint_result: &str,
    ) -> Result<String, AgentError> {
        let vars = Self::vars(job_json, lint_result);
        let response = self.agent.perform(playbook_text, &vars).await?;
        Ok(response.content)
    }

    /// Review and parse. The outer error is a hard failure; the inner one
    /// means the reviewer answered with something that is not a verdict.
    pub async fn review_verdict(
        &self,
        job_json: &str,
        playbook_text: &str,
        lint_result: &str,
    ) -> Result<Result<ReviewVerdict, OutputError>, AgentError> {
        let text = self.review(job_json, playbook_text, lint_result).await?;
        Ok(ReviewVerdict::parse(&text))
    }

    pub fn vars(job_json: &str, lint_result: &str) -> PromptVars {
        let mut vars = PromptVars::new();
        vars.insert(CONTROLM_JOB.to_string(), job_json.to_string());
        vars.insert(LINT.to_string(), lint_result.to_string());
        vars
    }
}
