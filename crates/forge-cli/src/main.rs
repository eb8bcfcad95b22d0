mod cmd;
mod executor;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{phase::PhaseSubcommand, provider::ProviderSubcommand, session::SessionSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "forge",
    about = "AI-assisted development phase orchestration",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .forge/ or .git/)
    #[arg(long, global = true, env = "FORGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize forge in the current project
    Init {
        /// Project name (default: directory name)
        name: Option<String>,

        /// Project template hint recorded in config
        #[arg(long, default_value = "")]
        template: String,

        /// Ask the default provider for a project scaffold outline
        #[arg(long)]
        scaffold: bool,
    },

    /// Inspect and drive development phases
    Phase {
        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },

    /// Execute the current phase's provider once
    Run {
        /// Prompt override (default: the phase's work prompt)
        #[arg(long)]
        prompt: Option<String>,

        /// Stream output as it arrives
        #[arg(long)]
        stream: bool,
    },

    /// Run phases automatically, checkpointing state between them
    Auto {
        /// First phase to run (default: resume after the last completed)
        #[arg(long)]
        from: Option<String>,

        /// Last phase to run, inclusive (default: deployment)
        #[arg(long)]
        until: Option<String>,

        /// Skip AI validation of completed phases
        #[arg(long)]
        skip_validation: bool,

        /// Show the resolved phase plan without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show project progress
    Status,

    /// Show the activity log
    History {
        /// Most recent entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Save, resume, and inspect session snapshots
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Inspect configured AI providers
    Provider {
        #[command(subcommand)]
        subcommand: ProviderSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            name,
            template,
            scaffold,
        } => cmd::init::run(&root, name.as_deref(), &template, scaffold),
        Commands::Phase { subcommand } => cmd::phase::run(&root, subcommand, cli.json),
        Commands::Run { prompt, stream } => cmd::run::run(&root, prompt.as_deref(), stream),
        Commands::Auto {
            from,
            until,
            skip_validation,
            dry_run,
        } => cmd::auto::run(
            &root,
            from.as_deref(),
            until.as_deref(),
            skip_validation,
            dry_run,
        ),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::History { limit } => cmd::history::run(&root, limit, cli.json),
        Commands::Session { subcommand } => cmd::session::run(&root, subcommand),
        Commands::Provider { subcommand } => cmd::provider::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
