//! Data model: job definitions in, playbooks and verdicts out.

pub mod feedback;
pub mod job;
pub mod output;
pub mod playbook;
pub mod verdict;

pub use feedback::Feedback;
pub use job::{DelaySpec, JobDefinition, RetryPolicy, Schedule};
pub use playbook::{HostPattern, Play, Playbook, Task};
pub use verdict::{ReviewStatus, ReviewVerdict};
