//! `jobplay convert`: run one job through the convert/review loop.

use jobplay_core::feedback::{FeedbackLoop, SessionReport};
use jobplay_core::mapping::playbook_from_job;
use jobplay_core::models::JobDefinition;

use super::{playbook_file_text, read_input, truncate, AppContext, Completion};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub job_file: String,
    /// Playbook destination; stdout when absent
    pub output: Option<String>,
    pub max_attempts: Option<u32>,
    pub lint_cmd: Option<String>,
    pub no_lint: bool,
    /// Write the session report as JSON here
    pub report: Option<String>,
}

pub async fn run(ctx: &AppContext, opts: &ConvertOptions) -> Result<Completion, String> {
    let job_text = read_input(&opts.job_file)?;
    let flow = ctx.feedback_loop(opts.max_attempts, opts.lint_cmd.as_deref(), opts.no_lint)?;

    let report = execute(&flow, &job_text).await?;
    print_summary(&report);

    write_playbook(opts.output.as_deref(), &playbook_file_text(&report.playbook))?;
    if let Some(path) = &opts.report {
        write_report(path, &report)?;
    }

    Ok(if report.converged() {
        Completion::Success
    } else {
        Completion::Unconverged
    })
}

/// Run a session and flatten its error for the command boundary.
pub async fn execute(flow: &FeedbackLoop, job_text: &str) -> Result<SessionReport, String> {
    flow.run(job_text).await.map_err(|e| e.to_string())
}

/// Map the job with the deterministic rules; no model involved.
pub fn offline(job_file: &str, output: Option<&str>) -> Result<Completion, String> {
    let job = JobDefinition::from_json(&read_input(job_file)?)?;
    let playbook = playbook_from_job(&job).map_err(|e| e.to_string())?;
    write_playbook(output, &playbook.to_yaml()?)?;
    eprintln!("✅ Mapped '{}' without a model", job.job_name);
    Ok(Completion::Success)
}

pub fn print_summary(report: &SessionReport) {
    eprintln!(
        "── Session {} ({}) ──",
        report.session_id,
        report.job_name.as_deref().unwrap_or("unnamed job")
    );
    for attempt in &report.attempts {
        let reviewed = if attempt.reviewed() { "" } else { " (review skipped)" };
        eprintln!(
            "   Attempt {}: {}{} — {}",
            attempt.attempt,
            attempt.verdict.status,
            reviewed,
            truncate(&attempt.verdict.comments, 60)
        );
        for warning in &attempt.warnings {
            eprintln!("   ⚠️  {}", warning);
        }
    }

    if report.converged() {
        eprintln!(
            "✅ Converged after {} attempt(s) in {}ms",
            report.attempts.len(),
            report.duration_ms()
        );
    } else {
        eprintln!("❌ Not valid after {} attempt(s); remaining improvements:", report.attempts.len());
        for item in &report.verdict.improvements {
            eprintln!("   - {}", truncate(item, 100));
        }
    }
}

pub fn write_playbook(output: Option<&str>, text: &str) -> Result<(), String> {
    match output {
        Some(path) => {
            std::fs::write(path, text).map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            eprintln!("📄 Playbook written to {}", path);
        }
        None => print!("{}", text),
    }
    Ok(())
}

pub fn write_report(path: &str, report: &SessionReport) -> Result<(), String> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| format!("Failed to serialize report: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write '{}': {}", path, e))
}
