//! Prompt construction: template rendering, turn delimiters and the
//! built-in role prompts.

pub mod builtin;
pub mod template;
pub mod turns;

pub use template::{referenced_placeholders, render, PromptVars};
pub use turns::TurnDelimiters;

/// Placeholder names shared across roles.
pub mod placeholders {
    pub const DATETIME: &str = "datetime";
    pub const FEEDBACK: &str = "feedback";
    pub const CONTROLM_JOB: &str = "controlm_job";
    pub const LINT: &str = "lint";
}
