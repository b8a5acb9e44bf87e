//! Feedback Loop Controller.
//!
//! ```text
//!            ┌────────────────────────── not valid, attempt < max ─┐
//!            ▼                                                     │
//!   Converting ──► (lint) ──► Reviewing ──► valid ──► Done         │
//!                                 │                                │
//!                                 ├────────────────────────────────┘
//!                                 └──► not valid, attempt == max ──► Exhausted
//! ```
//!
//! Output that fails the structural precheck skips `Reviewing` and takes
//! the not-valid edge directly.
//!
//! Feedback for the next conversion is the last verdict's improvements
//! joined with `"\n"`. Agent errors halt the session; unparseable model
//! output only produces warnings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{ConversionRole, ReviewRole};
use crate::error::{AgentError, SessionError, Warning};
use crate::lint::{LintResult, Linter};
use crate::models::{Feedback, JobDefinition, Playbook, ReviewVerdict};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Conversion attempts before giving up; values below 1 count as 1
    pub max_attempts: u32,
    /// Skip the review call when the conversion output is not a playbook
    pub precheck_structure: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            precheck_structure: true,
        }
    }
}

impl LoopConfig {
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Converting,
    Reviewing,
    Done,
    Exhausted,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Exhausted)
    }
}

/// Transition out of `Reviewing`, or out of `Converting` when the review
/// was skipped (`valid` is then false).
pub fn next_state(valid: bool, attempt: u32, max_attempts: u32) -> LoopState {
    if valid {
        LoopState::Done
    } else if attempt >= max_attempts.max(1) {
        LoopState::Exhausted
    } else {
        LoopState::Converting
    }
}

/// Cooperative cancellation, checked before every model call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One convert/review round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based
    pub attempt: u32,
    /// Feedback rendered into this attempt's conversion prompt
    pub feedback: String,
    pub playbook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintResult>,
    /// Reviewer's raw answer; absent when the review was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub verdict: ReviewVerdict,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl AttemptRecord {
    pub fn reviewed(&self) -> bool {
        self.review.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Converged,
    Exhausted,
}

/// Outcome of a session that ran to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    pub status: SessionStatus,
    /// Last playbook text produced
    pub playbook: String,
    /// Last verdict
    pub verdict: ReviewVerdict,
    pub attempts: Vec<AttemptRecord>,
    /// States entered, starting with `Converting`
    #[serde(default)]
    pub trail: Vec<LoopState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionReport {
    pub fn converged(&self) -> bool {
        self.status == SessionStatus::Converged
    }

    /// Conversions that ran with feedback from a previous review.
    pub fn feedback_iterations(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.attempts.iter().flat_map(|a| a.warnings.iter())
    }
}

/// Drives one conversion session per call. Holds no per-session state, so
/// one instance can serve many jobs concurrently.
pub struct FeedbackLoop {
    converter: ConversionRole,
    reviewer: ReviewRole,
    linter: Option<Arc<dyn Linter>>,
    config: LoopConfig,
}

impl FeedbackLoop {
    pub fn new(converter: ConversionRole, reviewer: ReviewRole) -> Self {
        Self {
            converter,
            reviewer,
            linter: None,
            config: LoopConfig::default(),
        }
    }

    pub fn with_linter(mut self, linter: Arc<dyn Linter>) -> Self {
        self.linter = Some(linter);
        self
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn converter(&self) -> &ConversionRole {
        &self.converter
    }

    pub fn reviewer(&self) -> &ReviewRole {
        &self.reviewer
    }

    pub async fn run_job(&self, job: &JobDefinition) -> Result<SessionReport, SessionError> {
        self.run(&job.to_prompt_json()).await
    }

    /// Run a session on raw job text. The text is passed to both roles verbatim.
    pub async fn run(&self, job_json: &str) -> Result<SessionReport, SessionError> {
        self.run_with_cancel(job_json, &CancelToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        job_json: &str,
        cancel: &CancelToken,
    ) -> Result<SessionReport, SessionError> {
        let session_id = Uuid::new_v4();
        let started_at = Utc::now();
        let max_attempts = self.config.attempt_limit();
        let job_name = JobDefinition::from_json(job_json).ok().map(|job| job.job_name);

        tracing::info!(
            "[FeedbackLoop] Session {} started (job: {}, max attempts: {})",
            session_id,
            job_name.as_deref().unwrap_or("<unparsed>"),
            max_attempts
        );

        let mut feedback = Feedback::default();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut attempt = 0;
        let mut state = LoopState::Converting;
        let mut trail = vec![state];
        let mut current: Option<AttemptRecord> = None;

        while !state.is_terminal() {
            state = match state {
                LoopState::Converting => {
                    attempt += 1;
                    let (record, reviewable) =
                        self.convert_step(job_json, attempt, &feedback, cancel).await?;
                    let next = if reviewable {
                        LoopState::Reviewing
                    } else {
                        next_state(false, attempt, max_attempts)
                    };
                    current = Some(record);
                    next
                }
                LoopState::Reviewing => match current.as_mut() {
                    Some(record) => {
                        self.review_step(job_json, record, cancel).await?;
                        next_state(record.verdict.is_valid(), attempt, max_attempts)
                    }
                    None => LoopState::Converting,
                },
                terminal => terminal,
            };
            trail.push(state);

            if state == LoopState::Reviewing {
                continue;
            }
            if let Some(record) = current.take() {
                tracing::info!(
                    "[FeedbackLoop] Session {} attempt {}/{}: {} → {:?}",
                    session_id,
                    attempt,
                    max_attempts,
                    record.verdict.status,
                    state
                );
                feedback = record.verdict.feedback();
                attempts.push(record);
            }
        }

        let status = match state {
            LoopState::Done => SessionStatus::Converged,
            _ => SessionStatus::Exhausted,
        };
        // The loop body runs at least once.
        let (playbook, verdict) = attempts
            .last()
            .map(|a| (a.playbook.clone(), a.verdict.clone()))
            .unwrap_or_else(|| (String::new(), ReviewVerdict::not_valid("", Vec::new())));

        let report = SessionReport {
            session_id,
            job_name,
            status,
            playbook,
            verdict,
            attempts,
            trail,
            started_at,
            finished_at: Utc::now(),
        };

        if report.converged() {
            tracing::info!(
                "[FeedbackLoop] Session {} converged after {} attempt(s) in {}ms",
                session_id,
                report.attempts.len(),
                report.duration_ms()
            );
        } else {
            tracing::warn!(
                "[FeedbackLoop] Session {} exhausted {} attempt(s) without a valid review",
                session_id,
                max_attempts
            );
        }

        Ok(report)
    }

    /// Convert and precheck. Returns false when the output failed the
    /// precheck; the record then already carries its verdict.
    async fn convert_step(
        &self,
        job_json: &str,
        attempt: u32,
        feedback: &Feedback,
        cancel: &CancelToken,
    ) -> Result<(AttemptRecord, bool), SessionError> {
        let converter = self.converter.agent().name().to_string();

        check_cancel(cancel, &converter, attempt)?;
        let rendered_feedback = feedback.render();
        let playbook = self
            .converter
            .convert(job_json, &rendered_feedback)
            .await
            .map_err(|source| agent_failure(&converter, attempt, source))?;

        let mut record = AttemptRecord {
            attempt,
            feedback: rendered_feedback,
            playbook,
            lint: None,
            review: None,
            verdict: ReviewVerdict::not_valid("", Vec::new()),
            warnings: Vec::new(),
        };

        if self.config.precheck_structure {
            if let Err(e) = Playbook::parse(&record.playbook) {
                let warning = Warning::UnstructuredOutput {
                    stage: converter.clone(),
                    message: e.to_string(),
                };
                tracing::warn!("[FeedbackLoop] Attempt {}: {}", attempt, warning);
                record.warnings.push(warning);
                record.verdict = ReviewVerdict::not_valid(
                    "Conversion output is not a playbook; review skipped.",
                    vec![format!(
                        "Output only the playbook as a JSON list of plays. The previous output could not be parsed: {}",
                        e
                    )],
                );
                return Ok((record, false));
            }
        }

        Ok((record, true))
    }

    async fn review_step(
        &self,
        job_json: &str,
        record: &mut AttemptRecord,
        cancel: &CancelToken,
    ) -> Result<(), SessionError> {
        let reviewer = self.reviewer.agent().name().to_string();
        let attempt = record.attempt;

        let lint_text = match &self.linter {
            Some(linter) => {
                let result = match linter.lint(&record.playbook).await {
                    Ok(result) => result,
                    Err(e) => {
                        let warning = Warning::LintUnavailable {
                            linter: linter.name().to_string(),
                            message: e.to_string(),
                        };
                        tracing::warn!("[FeedbackLoop] Attempt {}: {}", attempt, warning);
                        record.warnings.push(warning);
                        LintResult {
                            passed: false,
                            output: format!("Linter unavailable: {}", e),
                        }
                    }
                };
                let text = result.render();
                record.lint = Some(result);
                text
            }
            None => String::new(),
        };

        check_cancel(cancel, &reviewer, attempt)?;
        let review = self
            .reviewer
            .review(job_json, &record.playbook, &lint_text)
            .await
            .map_err(|source| agent_failure(&reviewer, attempt, source))?;

        record.verdict = match ReviewVerdict::parse(&review) {
            Ok(verdict) => {
                if let Some(anomaly) = verdict.anomaly() {
                    tracing::warn!("[FeedbackLoop] Attempt {}: {}", attempt, anomaly);
                    record.warnings.push(anomaly);
                }
                verdict
            }
            Err(e) => {
                let warning = Warning::UnstructuredOutput {
                    stage: reviewer.clone(),
                    message: e.to_string(),
                };
                tracing::warn!("[FeedbackLoop] Attempt {}: {}", attempt, warning);
                record.warnings.push(warning);
                ReviewVerdict::not_valid(
                    "Review output could not be parsed; using it verbatim as feedback.",
                    vec![review.trim().to_string()],
                )
            }
        };
        record.review = Some(review);

        Ok(())
    }
}

fn check_cancel(cancel: &CancelToken, stage: &str, attempt: u32) -> Result<(), SessionError> {
    if cancel.is_cancelled() {
        tracing::info!("[FeedbackLoop] Cancelled before {} on attempt {}", stage, attempt);
        return Err(SessionError::Cancelled {
            stage: stage.to_string(),
            attempt,
        });
    }
    Ok(())
}

fn agent_failure(role: &str, attempt: u32, source: AgentError) -> SessionError {
    tracing::error!("[FeedbackLoop] {} failed on attempt {}: {}", role, attempt, source);
    SessionError::Agent {
        role: role.to_string(),
        attempt,
        source,
    }
}
