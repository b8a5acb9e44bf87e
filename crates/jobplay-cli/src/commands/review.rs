//! `jobplay review`: review an existing playbook against its job.

use jobplay_core::agent::{ReviewRole, REVIEWER};
use jobplay_core::lint::Linter;

use super::{print_json, read_input, AppContext, Completion};

pub async fn run(
    ctx: &AppContext,
    job_file: &str,
    playbook_file: &str,
    lint_cmd: Option<&str>,
    no_lint: bool,
) -> Result<Completion, String> {
    let job_text = read_input(job_file)?;
    let playbook_text = read_input(playbook_file)?;

    let lint_text = match ctx.linter(lint_cmd, no_lint) {
        Some(linter) => match linter.lint(&playbook_text).await {
            Ok(result) => result.render(),
            Err(e) => {
                tracing::warn!("[Review] Linter '{}' unavailable: {}", linter.name(), e);
                format!("Linter unavailable: {}", e)
            }
        },
        None => String::new(),
    };

    let reviewer = ReviewRole::new(ctx.agent(REVIEWER, ctx.gateway()?)?);
    let verdict = reviewer
        .review_verdict(&job_text, &playbook_text, &lint_text)
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| format!("Reviewer answered with something that is not a verdict: {}", e))?;

    if let Some(anomaly) = verdict.anomaly() {
        tracing::warn!("[Review] {}", anomaly);
    }

    let value = serde_json::to_value(&verdict).map_err(|e| e.to_string())?;
    print_json(&value);

    Ok(if verdict.is_valid() {
        Completion::Success
    } else {
        Completion::Unconverged
    })
}
