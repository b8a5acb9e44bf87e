//! Integration tests for the jobplay CLI commands.
//!
//! Commands run through the same code paths as the binary, with a scripted
//! gateway standing in for the model server and temp dirs for files.

use std::path::Path;
use std::sync::Arc;

use jobplay_cli::commands::batch::{self, BatchOptions};
use jobplay_cli::commands::convert::{self, ConvertOptions};
use jobplay_cli::commands::roles::{self, RenderOptions};
use jobplay_cli::commands::{review, AppContext, Completion};
use jobplay_core::config::DelimiterSetting;
use jobplay_core::gateway::ScriptedGateway;
use jobplay_core::JobplayConfig;

const JOB: &str = r#"{
  "job_name": "data_backup",
  "command": "/usr/local/bin/backup.sh",
  "schedule": {"type": "daily", "time": "02:00"},
  "environment_variables": {"BACKUP_DIR": "/data/backup"},
  "retry": {"count": 3, "delay": "5m"}
}"#;

const PLAYBOOK: &str = r#"[{"name": "Run data backup job", "hosts": "localhost",
  "tasks": [{"name": "Run backup script", "ansible.builtin.shell": "/usr/local/bin/backup.sh"}]}]"#;

const VALID: &str = r#"{"status": "valid", "comments": "ok", "improvements": []}"#;
const NOT_VALID: &str = r#"{"status": "not valid", "comments": "no schedule", "improvements": ["add cron job"]}"#;

fn plain_config() -> JobplayConfig {
    JobplayConfig {
        delimiters: Some(DelimiterSetting::Preset("plain".to_string())),
        ..JobplayConfig::default()
    }
}

fn context(gateway: &Arc<ScriptedGateway>) -> AppContext {
    AppContext::new(plain_config())
        .expect("context")
        .with_gateway(gateway.clone())
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_convert_writes_playbook_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "data_backup.json", JOB);
    let output = dir.path().join("data_backup.yml");
    let report = dir.path().join("report.json");

    // One gateway serves both roles: convert, review, convert, review.
    let gateway = Arc::new(
        ScriptedGateway::new("stub")
            .then_content(PLAYBOOK)
            .then_content(NOT_VALID)
            .then_content(PLAYBOOK)
            .then_content(VALID),
    );
    let opts = ConvertOptions {
        job_file,
        output: Some(output.to_string_lossy().to_string()),
        report: Some(report.to_string_lossy().to_string()),
        ..ConvertOptions::default()
    };

    let completion = convert::run(&context(&gateway), &opts).await.unwrap();
    assert_eq!(completion, Completion::Success);
    assert_eq!(gateway.call_count(), 4);
    assert!(gateway.calls()[2].system_prompt.contains("add cron job"));

    let yaml = std::fs::read_to_string(&output).unwrap();
    assert!(yaml.contains("ansible.builtin.shell: /usr/local/bin/backup.sh"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["status"], "converged");
    assert_eq!(report["job_name"], "data_backup");
    assert_eq!(report["attempts"].as_array().unwrap().len(), 2);
    assert_eq!(report["attempts"][1]["feedback"], "add cron job");
}

#[tokio::test]
async fn test_convert_reports_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let gateway = Arc::new(
        ScriptedGateway::new("stub")
            .then_content(PLAYBOOK)
            .then_content(NOT_VALID)
            .then_content(PLAYBOOK)
            .then_content(NOT_VALID),
    );
    let opts = ConvertOptions {
        job_file,
        output: Some(dir.path().join("out.yml").to_string_lossy().to_string()),
        max_attempts: Some(2),
        no_lint: true,
        ..ConvertOptions::default()
    };

    let completion = convert::run(&context(&gateway), &opts).await.unwrap();
    assert_eq!(completion, Completion::Unconverged);
    assert_eq!(completion.exit_code(), 2);
    assert_eq!(gateway.call_count(), 4);
}

#[tokio::test]
async fn test_convert_surfaces_gateway_errors() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let gateway = Arc::new(ScriptedGateway::new("stub"));
    let opts = ConvertOptions {
        job_file,
        ..ConvertOptions::default()
    };

    let err = convert::run(&context(&gateway), &opts).await.unwrap_err();
    assert!(err.contains("converter"));
    assert!(err.contains("script exhausted"));
}

#[test]
fn test_offline_convert() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let output = dir.path().join("offline.yml");

    let completion = convert::offline(&job_file, Some(&output.to_string_lossy())).unwrap();
    assert_eq!(completion, Completion::Success);

    let yaml = std::fs::read_to_string(&output).unwrap();
    assert!(yaml.contains("ansible.builtin.cron"));
    assert!(yaml.contains("delay: 300"));
    assert!(yaml.contains("BACKUP_DIR: /data/backup"));
}

#[tokio::test]
async fn test_batch_writes_one_playbook_per_job() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write(dir.path(), "first.json", r#"{"job_name": "first", "command": "true"}"#),
        write(dir.path(), "second.json", r#"{"job_name": "second", "command": "true"}"#),
    ];
    let out_dir = dir.path().join("out");

    // Concurrency 1 runs sessions one after another: convert, review, convert, review.
    let gateway = Arc::new(
        ScriptedGateway::new("stub")
            .then_content(PLAYBOOK)
            .then_content(VALID)
            .then_content(PLAYBOOK)
            .then_content(VALID),
    );
    let opts = BatchOptions {
        job_files: files,
        out_dir: Some(out_dir.to_string_lossy().to_string()),
        concurrency: Some(1),
        ..BatchOptions::default()
    };

    let completion = batch::run(&context(&gateway), &opts).await.unwrap();
    assert_eq!(completion, Completion::Success);
    assert!(out_dir.join("first.yml").is_file());
    assert!(out_dir.join("second.yml").is_file());
}

#[tokio::test]
async fn test_review_command() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let playbook_file = write(dir.path(), "playbook.json", PLAYBOOK);

    let gateway = Arc::new(ScriptedGateway::always("stub", NOT_VALID));
    let completion = review::run(&context(&gateway), &job_file, &playbook_file, None, false)
        .await
        .unwrap();
    assert_eq!(completion, Completion::Unconverged);

    let call = &gateway.calls()[0];
    assert_eq!(call.user_text, PLAYBOOK);
    assert!(call.system_prompt.contains("No lint issues found."));
}

#[tokio::test]
async fn test_review_rejects_prose() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let playbook_file = write(dir.path(), "playbook.json", PLAYBOOK);

    let gateway = Arc::new(ScriptedGateway::always("stub", "Looks fine to me."));
    let err = review::run(&context(&gateway), &job_file, &playbook_file, None, true)
        .await
        .unwrap_err();
    assert!(err.contains("not a verdict"));
}

#[test]
fn test_render_reviewer_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let ctx = AppContext::new(plain_config()).unwrap();

    let text = roles::render(
        &ctx,
        &RenderOptions {
            role: "reviewer".to_string(),
            job_file,
            lint: Some("structure: ok".to_string()),
            ..RenderOptions::default()
        },
    )
    .unwrap();

    assert!(text.contains("\"job_name\": \"data_backup\""));
    assert!(text.contains("## Lint Result\n\nstructure: ok"));
    assert!(!text.contains("{controlm_job}"));
}

#[test]
fn test_render_unknown_role() {
    let dir = tempfile::tempdir().unwrap();
    let job_file = write(dir.path(), "job.json", JOB);
    let ctx = AppContext::new(plain_config()).unwrap();
    let err = roles::render(
        &ctx,
        &RenderOptions {
            role: "auditor".to_string(),
            job_file,
            ..RenderOptions::default()
        },
    )
    .unwrap_err();
    assert_eq!(err, "Unknown role 'auditor'");
}

#[test]
fn test_roles_dir_override() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "auditor.yaml",
        "name: auditor\nplaceholders: [controlm_job]\nsystem_prompt: \"Audit {controlm_job}\"\n",
    );
    let config = JobplayConfig {
        roles_dir: Some(dir.path().to_string_lossy().to_string()),
        ..plain_config()
    };
    let ctx = AppContext::new(config).unwrap();

    assert!(ctx.roles.is_overridden("auditor"));
    assert_eq!(ctx.roles.all().len(), 3);
    assert!(roles::list(&ctx).is_ok());
}
