//! `jobplay roles` and `jobplay render`: inspect role prompts.

use jobplay_core::agent::RoleSpec;
use jobplay_core::prompt::placeholders::{CONTROLM_JOB, FEEDBACK, LINT};
use jobplay_core::prompt::PromptVars;

use super::{read_input, truncate, AppContext};

pub fn list(ctx: &AppContext) -> Result<(), String> {
    println!("┌──────────────────┬──────────────────────────────────────┬──────────┐");
    println!("│ Role             │ Placeholders                         │ Source   │");
    println!("├──────────────────┼──────────────────────────────────────┼──────────┤");
    for role in ctx.roles.all() {
        let source = if ctx.roles.is_overridden(&role.name) { "file" } else { "builtin" };
        println!(
            "│ {:<16} │ {:<36} │ {:<8} │",
            truncate(&role.name, 16),
            truncate(&placeholder_list(&role), 36),
            source
        );
    }
    println!("└──────────────────┴──────────────────────────────────────┴──────────┘");
    Ok(())
}

fn placeholder_list(role: &RoleSpec) -> String {
    role.placeholders
        .iter()
        .map(|p| format!("{{{}}}", p))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub role: String,
    pub job_file: String,
    pub feedback: Vec<String>,
    pub lint: Option<String>,
    /// User turn; defaults to the job text
    pub input_file: Option<String>,
}

/// Rendered system prompt and wrapped user turn, exactly as a gateway
/// would receive them.
pub fn render(ctx: &AppContext, opts: &RenderOptions) -> Result<String, String> {
    let role = ctx.role(&opts.role)?;
    let delimiters = ctx.delimiters()?;
    let job_text = read_input(&opts.job_file)?;
    let user_text = match &opts.input_file {
        Some(path) => read_input(path)?,
        None => job_text.clone(),
    };

    let mut vars = PromptVars::new();
    vars.insert(FEEDBACK.to_string(), opts.feedback.join("\n"));
    vars.insert(CONTROLM_JOB.to_string(), job_text);
    vars.insert(LINT.to_string(), opts.lint.clone().unwrap_or_default());

    let system = role.render_now(&vars).map_err(|e| e.to_string())?;

    Ok(format!(
        "{}{}",
        delimiters.wrap_system(&system),
        delimiters.wrap_user(&user_text)
    ))
}

