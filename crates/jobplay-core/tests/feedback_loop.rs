//! Session-level behaviour of the convert/review loop, driven by scripted gateways.

use std::sync::Arc;

use jobplay_core::agent::{ConversionRole, ReviewRole};
use jobplay_core::error::{AgentError, SessionError};
use jobplay_core::feedback::{run_batch, BatchItem, FeedbackLoop, LoopConfig, SessionStatus};
use jobplay_core::gateway::{ScriptedGateway, ScriptedReply};
use jobplay_core::prompt::TurnDelimiters;

const DATA_BACKUP_JOB: &str = r#"{
  "job_name": "data_backup",
  "command": "/usr/local/bin/backup.sh",
  "schedule": {"type": "daily", "time": "02:00"},
  "environment_variables": {"BACKUP_DIR": "/data/backup"},
  "retry": {"count": 3, "delay": "5m"}
}"#;

const BACKUP_PLAYBOOK: &str = r#"- name: Run data backup job
  hosts: localhost
  tasks:
    - name: Run backup script
      ansible.builtin.shell: /usr/local/bin/backup.sh
      environment:
        BACKUP_DIR: /data/backup
      register: backup_result
      until: backup_result.rc == 0
      retries: 3
      delay: 300
    - name: Schedule backup
      ansible.builtin.cron:
        name: data_backup
        minute: "0"
        hour: "2"
        job: /usr/local/bin/backup.sh
"#;

const VALID: &str = r#"{"status": "valid", "comments": "Matches the job.", "improvements": []}"#;

fn not_valid(improvements: &[&str]) -> String {
    serde_json::json!({
        "status": "not valid",
        "comments": "Incomplete.",
        "improvements": improvements,
    })
    .to_string()
}

fn flow(converter: &Arc<ScriptedGateway>, reviewer: &Arc<ScriptedGateway>) -> FeedbackLoop {
    FeedbackLoop::new(
        ConversionRole::builtin(converter.clone(), TurnDelimiters::plain()),
        ReviewRole::builtin(reviewer.clone(), TurnDelimiters::plain()),
    )
}

#[tokio::test]
async fn test_valid_on_first_review_converges_without_feedback() {
    let converter = Arc::new(ScriptedGateway::always("converter", BACKUP_PLAYBOOK));
    let reviewer = Arc::new(ScriptedGateway::always("reviewer", VALID));

    let report = flow(&converter, &reviewer).run(DATA_BACKUP_JOB).await.unwrap();

    assert_eq!(report.status, SessionStatus::Converged);
    assert!(report.converged());
    assert_eq!(report.playbook, BACKUP_PLAYBOOK);
    assert_eq!(report.feedback_iterations(), 0);
    assert_eq!(report.job_name.as_deref(), Some("data_backup"));
    assert_eq!(converter.call_count(), 1);
    assert_eq!(reviewer.call_count(), 1);

    // The job goes to both roles; the reviewer sees the playbook as its task.
    assert_eq!(converter.calls()[0].user_text, DATA_BACKUP_JOB);
    assert!(reviewer.calls()[0].system_prompt.contains("/usr/local/bin/backup.sh"));
    assert_eq!(reviewer.calls()[0].user_text, BACKUP_PLAYBOOK);
}

#[tokio::test]
async fn test_review_improvements_reach_next_conversion() {
    let converter = Arc::new(ScriptedGateway::always("converter", BACKUP_PLAYBOOK));
    let reviewer = Arc::new(
        ScriptedGateway::new("reviewer")
            .then_content(not_valid(&["add cron job"]))
            .then_content(VALID),
    );

    let report = flow(&converter, &reviewer).run(DATA_BACKUP_JOB).await.unwrap();

    assert!(report.converged());
    assert_eq!(converter.call_count(), 2);
    assert_eq!(reviewer.call_count(), 2);
    assert!(!converter.calls()[0].system_prompt.contains("add cron job"));
    assert!(converter.calls()[1].system_prompt.contains("add cron job"));
    assert_eq!(report.attempts[1].feedback, "add cron job");
}

#[tokio::test]
async fn test_feedback_items_are_newline_joined() {
    let converter = Arc::new(ScriptedGateway::always("converter", BACKUP_PLAYBOOK));
    let reviewer = Arc::new(
        ScriptedGateway::new("reviewer")
            .then_content(not_valid(&["fix A", "fix B"]))
            .then_content(VALID),
    );

    flow(&converter, &reviewer).run(DATA_BACKUP_JOB).await.unwrap();

    assert!(converter.calls()[1]
        .system_prompt
        .contains("Feedback:\n\nfix A\nfix B\n"));
}

#[tokio::test]
async fn test_no_calls_after_done() {
    let converter = Arc::new(ScriptedGateway::always("converter", BACKUP_PLAYBOOK));
    let reviewer = Arc::new(
        ScriptedGateway::new("reviewer")
            .then_content(not_valid(&["one"]))
            .then_content(not_valid(&["two"]))
            .then_content(VALID),
    );

    let report = flow(&converter, &reviewer)
        .with_config(LoopConfig {
            max_attempts: 10,
            ..LoopConfig::default()
        })
        .run(DATA_BACKUP_JOB)
        .await
        .unwrap();

    assert!(report.converged());
    assert_eq!(report.attempts.len(), 3);
    assert_eq!(converter.call_count(), 3);
    assert_eq!(reviewer.call_count(), 3);
}

#[tokio::test]
async fn test_exhaustion_stops_at_max_attempts() {
    let converter = Arc::new(ScriptedGateway::always("converter", BACKUP_PLAYBOOK));
    let reviewer = Arc::new(ScriptedGateway::always("reviewer", not_valid(&["still wrong"])));

    let report = flow(&converter, &reviewer)
        .with_config(LoopConfig {
            max_attempts: 3,
            ..LoopConfig::default()
        })
        .run(DATA_BACKUP_JOB)
        .await
        .unwrap();

    assert_eq!(report.status, SessionStatus::Exhausted);
    assert!(!report.converged());
    assert_eq!(converter.call_count(), 3);
    assert_eq!(reviewer.call_count(), 3);
    assert_eq!(report.playbook, BACKUP_PLAYBOOK);
    assert_eq!(report.verdict.improvements, vec!["still wrong".to_string()]);
}

#[tokio::test]
async fn test_malformed_conversion_halts_before_review() {
    let converter = Arc::new(
        ScriptedGateway::new("converter")
            .then(ScriptedReply::Body(serde_json::json!({"model": "llama3.1", "done": true}))),
    );
    let reviewer = Arc::new(ScriptedGateway::always("reviewer", VALID));

    let err = flow(&converter, &reviewer).run(DATA_BACKUP_JOB).await.unwrap_err();

    match err {
        SessionError::Agent { role, attempt, source } => {
            assert_eq!(role, "converter");
            assert_eq!(attempt, 1);
            assert!(matches!(source, AgentError::MalformedResponse { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(reviewer.call_count(), 0);
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let converter = Arc::new(ScriptedGateway::always("converter", BACKUP_PLAYBOOK));
    let reviewer = Arc::new(ScriptedGateway::always("reviewer", VALID));
    let flow = Arc::new(flow(&converter, &reviewer));

    let items: Vec<BatchItem> = (0..5)
        .map(|i| {
            BatchItem::new(
                format!("job-{i}.json"),
                format!(r#"{{"job_name": "job_{i}", "command": "true"}}"#),
            )
        })
        .collect();

    let outcomes = run_batch(flow, items, 2).await;

    assert_eq!(outcomes.len(), 5);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.label, format!("job-{i}.json"));
        let report = outcome.result.as_ref().unwrap();
        assert_eq!(report.job_name.as_deref(), Some(format!("job_{i}").as_str()));
    }
    assert_eq!(converter.call_count(), 5);
}
