//! `jobplay batch`: convert many jobs concurrently.

use std::path::Path;
use std::sync::Arc;

use jobplay_core::feedback::{run_batch, BatchItem, BatchOutcome};

use super::{playbook_file_text, read_input, truncate, AppContext, Completion};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub job_files: Vec<String>,
    /// Defaults to the current directory
    pub out_dir: Option<String>,
    pub concurrency: Option<usize>,
    pub max_attempts: Option<u32>,
    pub lint_cmd: Option<String>,
    pub no_lint: bool,
}

pub async fn run(ctx: &AppContext, opts: &BatchOptions) -> Result<Completion, String> {
    if opts.job_files.is_empty() {
        return Err("No job files given".to_string());
    }

    let mut items = Vec::with_capacity(opts.job_files.len());
    for file in &opts.job_files {
        items.push(BatchItem::new(stem(file), read_input(file)?));
    }

    let out_dir = opts.out_dir.as_deref().unwrap_or(".");
    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir, e))?;

    let flow = Arc::new(ctx.feedback_loop(opts.max_attempts, opts.lint_cmd.as_deref(), opts.no_lint)?);
    let concurrency = opts.concurrency.unwrap_or(ctx.config.concurrency);
    let outcomes = run_batch(flow, items, concurrency).await;

    let rows = write_outputs(out_dir, &outcomes)?;
    print_table(&rows);

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        return Err(format!("{} of {} job(s) failed", failed, outcomes.len()));
    }
    let all_converged = outcomes
        .iter()
        .all(|o| o.result.as_ref().map(|r| r.converged()).unwrap_or(false));
    Ok(if all_converged {
        Completion::Success
    } else {
        Completion::Unconverged
    })
}

struct Row {
    label: String,
    status: String,
    attempts: String,
    output: String,
}

fn write_outputs(out_dir: &str, outcomes: &[BatchOutcome]) -> Result<Vec<Row>, String> {
    let mut rows = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let row = match &outcome.result {
            Ok(report) => {
                let path = Path::new(out_dir).join(format!("{}.yml", outcome.label));
                std::fs::write(&path, playbook_file_text(&report.playbook))
                    .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
                Row {
                    label: outcome.label.clone(),
                    status: if report.converged() { "valid" } else { "exhausted" }.to_string(),
                    attempts: report.attempts.len().to_string(),
                    output: path.display().to_string(),
                }
            }
            Err(e) => Row {
                label: outcome.label.clone(),
                status: "error".to_string(),
                attempts: e.failed_role().map(|(_, n)| n.to_string()).unwrap_or_default(),
                output: e.to_string(),
            },
        };
        rows.push(row);
    }
    Ok(rows)
}

fn print_table(rows: &[Row]) {
    println!("┌──────────────────────┬───────────┬──────────┬──────────────────────────────┐");
    println!("│ Job                  │ Status    │ Attempts │ Output                       │");
    println!("├──────────────────────┼───────────┼──────────┼──────────────────────────────┤");
    for row in rows {
        println!(
            "│ {:<20} │ {:<9} │ {:<8} │ {:<28} │",
            truncate(&row.label, 20),
            row.status,
            row.attempts,
            truncate(&row.output, 28)
        );
    }
    println!("└──────────────────────┴───────────┴──────────┴──────────────────────────────┘");
}

fn stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string())
}
