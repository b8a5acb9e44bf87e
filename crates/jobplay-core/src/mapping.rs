//! Deterministic job → playbook mapping.
//!
//! Applies the same rules the conversion prompt describes, without a model:
//!
//! | Job field               | Playbook construct                               |
//! |-------------------------|--------------------------------------------------|
//! | `command`               | `ansible.builtin.shell` task                     |
//! | `schedule`              | `ansible.builtin.cron` task (minute/hour/...)    |
//! | `environment_variables` | `environment` on the shell task                  |
//! | `retry`                 | `register` + `until` + `retries` + `delay` (sec) |
//! | `depends_on`            | `when: <dep>_completed \| default(false)`        |

use serde_json::{json, Map, Value};

use crate::error::MappingError;
use crate::models::{HostPattern, JobDefinition, Play, Playbook, Schedule, Task};

/// Cron fields; `*` means "every".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronFields {
    pub minute: String,
    pub hour: String,
    pub day: String,
    pub month: String,
    pub weekday: String,
}

impl Default for CronFields {
    fn default() -> Self {
        Self {
            minute: "*".to_string(),
            hour: "*".to_string(),
            day: "*".to_string(),
            month: "*".to_string(),
            weekday: "*".to_string(),
        }
    }
}

pub fn playbook_from_job(job: &JobDefinition) -> Result<Playbook, MappingError> {
    let command = job
        .command
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| MappingError::MissingCommand(job.job_name.clone()))?;

    let var = variable_name(&job.job_name);
    let mut tasks = vec![shell_task(job, command, &var)?];

    if let Some(schedule) = &job.schedule {
        let fields = cron_fields(schedule)?;
        tasks.push(cron_task(&job.job_name, command, &fields));
    }

    let mut fact = Map::new();
    fact.insert(format!("{}_completed", var), Value::Bool(true));
    tasks.push(
        Task::named(format!("Mark {} as completed", job.job_name))
            .with("ansible.builtin.set_fact", Value::Object(fact)),
    );

    Ok(Playbook {
        plays: vec![Play {
            name: format!("Convert Control-M job {}", job.job_name),
            hosts: Some(HostPattern::One("localhost".to_string())),
            r#become: None,
            vars: Default::default(),
            tasks,
            handlers: Vec::new(),
        }],
    })
}

fn shell_task(job: &JobDefinition, command: &str, var: &str) -> Result<Task, MappingError> {
    let mut task = Task::named(format!("Run {}", job.job_name)).with("ansible.builtin.shell", command);

    let env = job.environment();
    if !env.is_empty() {
        task = task.with("environment", json!(env));
    }

    if let Some(retry) = job.retry.as_ref().filter(|r| r.count > 0) {
        let result_var = format!("{}_result", var);
        task = task
            .with("register", result_var.clone())
            .with("until", format!("{}.rc == 0", result_var))
            .with("retries", retry.count);
        if let Some(delay) = &retry.delay {
            task = task.with("delay", delay.to_seconds()?);
        }
    }

    if !job.depends_on.is_empty() {
        let conditions: Vec<Value> = job
            .depends_on
            .iter()
            .map(|dep| json!(format!("{}_completed | default(false)", variable_name(dep))))
            .collect();
        task = task.with("when", Value::Array(conditions));
    }

    Ok(task)
}

fn cron_task(job_name: &str, command: &str, fields: &CronFields) -> Task {
    let mut args = Map::new();
    args.insert("name".to_string(), json!(job_name));
    args.insert("minute".to_string(), json!(fields.minute));
    args.insert("hour".to_string(), json!(fields.hour));
    for (key, value) in [
        ("day", &fields.day),
        ("month", &fields.month),
        ("weekday", &fields.weekday),
    ] {
        if value != "*" {
            args.insert(key.to_string(), json!(value));
        }
    }
    args.insert("job".to_string(), json!(command));

    Task::named(format!("Schedule {}", job_name)).with("ansible.builtin.cron", Value::Object(args))
}

/// Derive cron fields from a job schedule.
pub fn cron_fields(schedule: &Schedule) -> Result<CronFields, MappingError> {
    if let Some(expr) = schedule.cron.as_deref() {
        return parse_cron_expression(expr);
    }

    let kind = schedule
        .kind
        .as_deref()
        .map(|k| k.trim().to_lowercase())
        .unwrap_or_else(|| {
            if schedule.time.is_some() {
                "daily".to_string()
            } else {
                "cron".to_string()
            }
        });

    let mut fields = CronFields::default();
    match kind.as_str() {
        "daily" => {
            let (minute, hour) = required_time(schedule)?;
            fields.minute = minute;
            fields.hour = hour;
        }
        "hourly" => {
            fields.minute = match schedule.time.as_deref() {
                Some(time) => minute_of(time)?,
                None => "0".to_string(),
            };
        }
        "weekly" => {
            let (minute, hour) = required_time(schedule)?;
            fields.minute = minute;
            fields.hour = hour;
            fields.weekday = schedule
                .day
                .as_deref()
                .map(|d| d.trim().to_lowercase())
                .ok_or_else(|| MappingError::InvalidSchedule("weekly schedule without a day".to_string()))?;
        }
        "monthly" => {
            let (minute, hour) = required_time(schedule)?;
            fields.minute = minute;
            fields.hour = hour;
            fields.day = schedule.day.clone().unwrap_or_else(|| "1".to_string());
        }
        "cron" => {
            // Individual fields exported as separate keys
            for (key, slot) in [
                ("minute", &mut fields.minute),
                ("hour", &mut fields.hour),
                ("day_of_month", &mut fields.day),
                ("month", &mut fields.month),
                ("day_of_week", &mut fields.weekday),
            ] {
                if let Some(value) = schedule.extra.get(key) {
                    *slot = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                }
            }
        }
        other => return Err(MappingError::InvalidSchedule(format!("unknown type '{}'", other))),
    }

    Ok(fields)
}

fn parse_cron_expression(expr: &str) -> Result<CronFields, MappingError> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(MappingError::InvalidSchedule(format!(
            "cron expression '{}' must have five fields",
            expr
        )));
    }
    Ok(CronFields {
        minute: parts[0].to_string(),
        hour: parts[1].to_string(),
        day: parts[2].to_string(),
        month: parts[3].to_string(),
        weekday: parts[4].to_string(),
    })
}

fn required_time(schedule: &Schedule) -> Result<(String, String), MappingError> {
    let time = schedule
        .time
        .as_deref()
        .ok_or_else(|| MappingError::InvalidSchedule("schedule without a time".to_string()))?;
    let (hour, minute) = parse_time(time)?;
    Ok((minute.to_string(), hour.to_string()))
}

fn minute_of(time: &str) -> Result<String, MappingError> {
    if let Ok(minute) = time.trim().parse::<u32>() {
        if minute < 60 {
            return Ok(minute.to_string());
        }
    }
    Ok(parse_time(time)?.1.to_string())
}

/// `"02:00"`, `"2:00"` or `"0200"` → `(2, 0)`.
pub fn parse_time(time: &str) -> Result<(u32, u32), MappingError> {
    let invalid = || MappingError::InvalidTime(time.to_string());
    let trimmed = time.trim();

    let (hour, minute) = match trimmed.split_once(':') {
        Some((h, m)) => (h, m),
        None if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) => {
            trimmed.split_at(2)
        }
        None => return Err(invalid()),
    };

    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// Job names like `data-backup.v2` become `data_backup_v2` for use in
/// Ansible variable names.
fn variable_name(job_name: &str) -> String {
    job_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
