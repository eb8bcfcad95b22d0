use anyhow::Context;
use clap::Subcommand;
use forge_core::config::ProjectConfig;
use forge_core::{io, paths, Phase, PhaseStatus, ProjectState};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Write a markdown snapshot of the project for handing to an AI tool
    Save {
        /// Output file (default: .forge/session.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Free-form context to embed in the snapshot
        #[arg(long)]
        context: Option<String>,
    },

    /// Print the resume prompt from a saved session
    Resume {
        /// Session file (default: .forge/session.md)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the saved session snapshot
    Show,
}

pub fn run(root: &Path, subcommand: SessionSubcommand) -> anyhow::Result<()> {
    match subcommand {
        SessionSubcommand::Save { output, context } => save(root, output, context.as_deref()),
        SessionSubcommand::Resume { input } => resume(root, input),
        SessionSubcommand::Show => show(root),
    }
}

fn save(root: &Path, output: Option<PathBuf>, context: Option<&str>) -> anyhow::Result<()> {
    let state = ProjectState::load(root).context("failed to load state")?;
    let config = ProjectConfig::load(root).context("failed to load config")?;

    let content = build_session_markdown(root, &state, &config, context);
    let path = output.unwrap_or_else(|| paths::session_path(root));
    io::atomic_write(&path, content.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Session saved: {}", path.display());
    Ok(())
}

fn resume(root: &Path, input: Option<PathBuf>) -> anyhow::Result<()> {
    let path = input.unwrap_or_else(|| paths::session_path(root));
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("no session found at {}", path.display()))?;

    // The resume prompt is the last section; print from its heading on so
    // the output can be piped straight into a tool.
    match content.find("## Resume Prompt") {
        Some(pos) => print!("{}", &content[pos..]),
        None => print!("{content}"),
    }
    Ok(())
}

fn show(root: &Path) -> anyhow::Result<()> {
    let path = paths::session_path(root);
    if !path.exists() {
        println!("No saved session. Run: forge session save");
        return Ok(());
    }
    print!("{}", std::fs::read_to_string(&path)?);
    Ok(())
}

fn build_session_markdown(
    root: &Path,
    state: &ProjectState,
    config: &ProjectConfig,
    context: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Forge Session: {}", config.name);
    let _ = writeln!(out, "\nGenerated: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    if !config.description.is_empty() {
        let _ = writeln!(out, "\n{}", config.description);
    }

    let _ = writeln!(out, "\n## Progress\n");
    for phase in Phase::all() {
        let status = state.phase_status(*phase);
        let mark = match status {
            PhaseStatus::Completed => "x",
            _ => " ",
        };
        let current = if state.current_phase == Some(*phase) {
            " (current)"
        } else {
            ""
        };
        let _ = writeln!(out, "- [{mark}] {phase}: {status}{current}");
    }

    let _ = writeln!(out, "\n## Artifacts\n");
    let mut any = false;
    for phase in Phase::all() {
        let dir = paths::artifacts_dir(root, *phase);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.path().is_file() {
                any = true;
                let _ = writeln!(out, "- {}/{}", phase, entry.file_name().to_string_lossy());
            }
        }
    }
    if !any {
        let _ = writeln!(out, "(none yet)");
    }

    if let Some(context) = context {
        let _ = writeln!(out, "\n## Context\n\n{context}");
    }

    let _ = writeln!(out, "\n## Next Steps\n");
    match state.current_phase {
        Some(phase) => {
            let _ = writeln!(out, "- Finish the '{phase}' phase and run: forge phase complete");
        }
        None => match next_pending(state) {
            Some(phase) => {
                let _ = writeln!(out, "- Start the next phase: forge phase start {phase}");
            }
            None => {
                let _ = writeln!(out, "- All phases completed.");
            }
        },
    }

    let _ = writeln!(out, "\n## Resume Prompt\n");
    let _ = writeln!(
        out,
        "I am resuming work on '{}', a project managed with forge. \
         The progress and artifacts above describe where things stand. \
         Please review them and continue with the next steps listed.",
        config.name
    );

    out
}

fn next_pending(state: &ProjectState) -> Option<Phase> {
    Phase::all()
        .iter()
        .copied()
        .find(|p| state.phase_status(*p) != PhaseStatus::Completed)
}
