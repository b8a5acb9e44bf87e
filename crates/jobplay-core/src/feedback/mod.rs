//! Convert → review feedback loop, one session per job, plus a bounded
//! concurrent runner for many jobs.

pub mod batch;
pub mod controller;

pub use crate::models::Feedback;
pub use batch::{run_batch, run_batch_with_cancel, BatchItem, BatchOutcome};
pub use controller::{
    next_state, AttemptRecord, CancelToken, FeedbackLoop, LoopConfig, LoopState, SessionReport,
    SessionStatus,
};
