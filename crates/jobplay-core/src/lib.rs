//! jobplay core: role agents and the convert/review feedback loop.
//!
//! Turns Control-M job definitions (JSON) into Ansible playbooks by asking a
//! model to convert the job, asking a second role to review the result, and
//! feeding the review's improvements back into the next conversion.
//!
//! ```text
//! job.json ──► ConversionRole ──► playbook ──► Linter ──► ReviewRole ──► verdict
//!                    ▲                                                     │
//!                    └──────────────── feedback (not valid) ◄──────────────┘
//! ```
//!
//! The crate has no CLI dependency; the `jobplay` binary lives in `jobplay-cli`.

pub mod agent;
pub mod config;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod lint;
pub mod mapping;
pub mod models;
pub mod prompt;

// Convenience re-exports
pub use agent::{ConversionRole, ReviewRole, RoleAgent, RoleResponse, RoleSpec};
pub use config::JobplayConfig;
pub use error::{AgentError, SessionError, Warning};
pub use feedback::{FeedbackLoop, LoopConfig, SessionReport, SessionStatus};
pub use gateway::ModelGateway;
