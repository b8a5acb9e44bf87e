//! Many independent sessions at once, bounded by a semaphore.

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::controller::{CancelToken, FeedbackLoop, SessionReport};
use crate::error::SessionError;

/// One job to convert. `label` is usually the source file name.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub label: String,
    pub job_json: String,
}

impl BatchItem {
    pub fn new(label: impl Into<String>, job_json: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            job_json: job_json.into(),
        }
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: Result<SessionReport, SessionError>,
}

/// Run one session per item, at most `concurrency` at a time. Outcomes come
/// back in input order; one failing job does not affect the others.
pub async fn run_batch(
    flow: Arc<FeedbackLoop>,
    items: Vec<BatchItem>,
    concurrency: usize,
) -> Vec<BatchOutcome> {
    run_batch_with_cancel(flow, items, concurrency, CancelToken::new()).await
}

pub async fn run_batch_with_cancel(
    flow: Arc<FeedbackLoop>,
    items: Vec<BatchItem>,
    concurrency: usize,
    cancel: CancelToken,
) -> Vec<BatchOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    tracing::info!(
        "[Batch] Running {} job(s) with concurrency {}",
        items.len(),
        concurrency.max(1)
    );

    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let flow = flow.clone();
        let semaphore = semaphore.clone();
        let cancel = cancel.clone();
        let label = item.label.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SessionError::Join(e.to_string()))?;
            tracing::debug!("[Batch] Starting {}", item.label);
            flow.run_with_cancel(&item.job_json, &cancel).await
        });
        handles.push((label, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (label, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(SessionError::Join(e.to_string())),
        };
        if let Err(ref e) = result {
            tracing::warn!("[Batch] {} failed: {}", label, e);
        }
        outcomes.push(BatchOutcome { label, result });
    }

    outcomes
}
