//! jobplay CLI: convert Control-M jobs into Ansible playbooks with a
//! model, reviewed by a second role until the review comes back valid.

use clap::{Parser, Subcommand};

use jobplay_cli::commands::{self, Completion};

/// jobplay: Control-M to Ansible conversion with review feedback
#[derive(Parser)]
#[command(name = "jobplay", version, about = "jobplay — Control-M to Ansible conversion with review feedback")]
pub struct Cli {
    /// Path to the configuration file (default: ./jobplay.yaml, then the user config dir)
    #[arg(long, global = true, env = "JOBPLAY_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one job, reviewing and revising until valid
    Convert {
        /// Control-M job JSON file ("-" for stdin)
        job_file: String,
        /// Write the playbook here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        /// Conversion attempts before giving up
        #[arg(long)]
        max_attempts: Option<u32>,
        /// External linter command, e.g. "ansible-lint --nocolor"
        #[arg(long)]
        lint_cmd: Option<String>,
        /// Do not lint before review
        #[arg(long)]
        no_lint: bool,
        /// Map the job with the built-in rules instead of calling a model
        #[arg(long)]
        offline: bool,
        /// Write the session report (JSON) to this file
        #[arg(long)]
        report: Option<String>,
    },

    /// Convert many jobs concurrently
    Batch {
        /// Control-M job JSON files
        #[arg(required = true)]
        job_files: Vec<String>,
        /// Directory for the generated playbooks
        #[arg(long)]
        out_dir: Option<String>,
        /// Sessions running at once
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        lint_cmd: Option<String>,
        #[arg(long)]
        no_lint: bool,
    },

    /// Review an existing playbook against its job
    Review {
        job_file: String,
        playbook_file: String,
        #[arg(long)]
        lint_cmd: Option<String>,
        #[arg(long)]
        no_lint: bool,
    },

    /// List role definitions
    Roles {
        /// Role definitions directory (overrides roles_dir from the config)
        #[arg(long)]
        roles_dir: Option<String>,
    },

    /// Print the prompt a role would send for a job
    Render {
        /// Role name, e.g. converter or reviewer
        role: String,
        /// Control-M job JSON file
        job_file: String,
        /// Feedback item; repeat for several
        #[arg(long)]
        feedback: Vec<String>,
        /// Lint result text
        #[arg(long)]
        lint: Option<String>,
        /// User turn file (default: the job itself)
        #[arg(long)]
        input: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobplay_core=warn,jobplay_cli=info".into()),
        )
        .init();

    let result = run(cli).await;

    match result {
        Ok(completion) => std::process::exit(completion.exit_code()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<Completion, String> {
    match cli.command {
        Commands::Convert {
            job_file,
            output,
            max_attempts,
            lint_cmd,
            no_lint,
            offline,
            report,
        } => {
            if offline {
                return commands::convert::offline(&job_file, output.as_deref());
            }
            let ctx = commands::init_context(cli.config.as_deref())?;
            let opts = commands::convert::ConvertOptions {
                job_file,
                output,
                max_attempts,
                lint_cmd,
                no_lint,
                report,
            };
            commands::convert::run(&ctx, &opts).await
        }

        Commands::Batch {
            job_files,
            out_dir,
            concurrency,
            max_attempts,
            lint_cmd,
            no_lint,
        } => {
            let ctx = commands::init_context(cli.config.as_deref())?;
            let opts = commands::batch::BatchOptions {
                job_files,
                out_dir,
                concurrency,
                max_attempts,
                lint_cmd,
                no_lint,
            };
            commands::batch::run(&ctx, &opts).await
        }

        Commands::Review {
            job_file,
            playbook_file,
            lint_cmd,
            no_lint,
        } => {
            let ctx = commands::init_context(cli.config.as_deref())?;
            commands::review::run(&ctx, &job_file, &playbook_file, lint_cmd.as_deref(), no_lint).await
        }

        Commands::Roles { roles_dir } => {
            commands::load_dotenv();
            let mut config = jobplay_core::JobplayConfig::discover(cli.config.as_deref())
                .map_err(|e| e.to_string())?;
            if roles_dir.is_some() {
                config.roles_dir = roles_dir;
            }
            let ctx = commands::AppContext::new(config)?;
            commands::roles::list(&ctx)?;
            Ok(Completion::Success)
        }

        Commands::Render {
            role,
            job_file,
            feedback,
            lint,
            input,
        } => {
            let ctx = commands::init_context(cli.config.as_deref())?;
            let opts = commands::roles::RenderOptions {
                role,
                job_file,
                feedback,
                lint,
                input_file: input,
            };
            print!("{}", commands::roles::render(&ctx, &opts)?);
            Ok(Completion::Success)
        }
    }
}
