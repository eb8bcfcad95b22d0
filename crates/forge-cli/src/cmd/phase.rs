use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::checkpoint::validate_checkpoint;
use forge_core::config::ProjectConfig;
use forge_core::history::PhaseHistory;
use forge_core::lock::StateLock;
use forge_core::{io, paths, ForgeError, Phase, PhaseStatus, ProjectState};
use std::path::Path;

#[derive(Subcommand)]
pub enum PhaseSubcommand {
    /// List all phases with their status and tool
    List,

    /// Show a phase's description, criteria, and artifacts
    Info { phase: String },

    /// Start a phase
    Start {
        phase: String,

        /// Ignore phase ordering and an already-active phase
        #[arg(long)]
        force: bool,
    },

    /// Complete the active phase
    Complete {
        /// Skip checkpoint validation
        #[arg(long)]
        skip_check: bool,
    },
}

pub fn run(root: &Path, subcommand: PhaseSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        PhaseSubcommand::List => list(root, json),
        PhaseSubcommand::Info { phase } => info(&phase, json),
        PhaseSubcommand::Start { phase, force } => start(root, &phase, force),
        PhaseSubcommand::Complete { skip_check } => complete(root, skip_check),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = ProjectState::load(root).context("failed to load state")?;
    let config = ProjectConfig::load(root).context("failed to load config")?;

    if json {
        #[derive(serde::Serialize)]
        struct PhaseRow<'a> {
            phase: &'a str,
            status: String,
            tool: &'a str,
            current: bool,
        }
        let rows: Vec<PhaseRow> = Phase::all()
            .iter()
            .map(|p| PhaseRow {
                phase: p.as_str(),
                status: state.phase_status(*p).to_string(),
                tool: config.tool_for_phase(*p),
                current: state.current_phase == Some(*p),
            })
            .collect();
        return print_json(&rows);
    }

    let rows: Vec<Vec<String>> = Phase::all()
        .iter()
        .map(|p| {
            let marker = if state.current_phase == Some(*p) { "*" } else { "" };
            vec![
                format!("{}{}", p.as_str(), marker),
                state.phase_status(*p).to_string(),
                config.tool_for_phase(*p).to_string(),
            ]
        })
        .collect();
    print_table(&["PHASE", "STATUS", "TOOL"], rows);
    Ok(())
}

fn info(phase_name: &str, json: bool) -> anyhow::Result<()> {
    let phase: Phase = phase_name.parse::<Phase>().map_err(anyhow::Error::from)?;
    let spec = phase.spec();

    if json {
        #[derive(serde::Serialize)]
        struct Info<'a> {
            phase: &'a str,
            description: &'a str,
            primary_tool: &'a str,
            tool_reason: &'a str,
            criteria: &'a [&'a str],
            artifacts: &'a [&'a str],
        }
        return print_json(&Info {
            phase: spec.name,
            description: spec.description,
            primary_tool: spec.primary_tool,
            tool_reason: spec.tool_reason,
            criteria: spec.criteria,
            artifacts: spec.artifacts,
        });
    }

    println!("Phase: {}", spec.name);
    println!("Description: {}", spec.description);
    println!("Tool: {} ({})", spec.primary_tool, spec.tool_reason);
    println!("\nCheckpoint criteria:");
    for c in spec.criteria {
        println!("  - {c}");
    }
    println!("\nExpected artifacts:");
    for a in spec.artifacts {
        println!("  - {a}");
    }
    Ok(())
}

fn start(root: &Path, phase_name: &str, force: bool) -> anyhow::Result<()> {
    let mut lock = StateLock::new(root)?;
    let _guard = lock.lock()?;

    let phase: Phase = phase_name.parse::<Phase>().map_err(anyhow::Error::from)?;
    let mut state = ProjectState::load(root).context("failed to load state")?;

    if !force {
        if let Some(current) = state.current_phase {
            return Err(ForgeError::AlreadyInPhase(current.to_string()).into());
        }
        if let Some(previous) = phase.previous() {
            if state.phase_status(previous) != PhaseStatus::Completed {
                return Err(ForgeError::PhaseOrderViolation {
                    phase: phase.to_string(),
                    missing: previous.to_string(),
                }
                .into());
            }
        }
    }

    io::ensure_dir(&paths::artifacts_dir(root, phase))?;

    state.current_phase = Some(phase);
    state.phase_started_at = Some(chrono::Utc::now());
    state.set_phase_status(phase, PhaseStatus::InProgress);
    state.add_activity(format!("Started phase: {phase}"));
    state.save(root).context("failed to save state")?;

    let spec = phase.spec();
    println!("Started phase: {phase}");
    println!("Tool: {} ({})", spec.primary_tool, spec.tool_reason);
    println!("Artifacts expected: {}", spec.artifacts.join(", "));
    Ok(())
}

fn complete(root: &Path, skip_check: bool) -> anyhow::Result<()> {
    let mut lock = StateLock::new(root)?;
    let _guard = lock.lock()?;

    let mut state = ProjectState::load(root).context("failed to load state")?;
    let phase = state.current_phase.ok_or(ForgeError::NoActivePhase)?;

    if !skip_check {
        let result = validate_checkpoint(root, phase.as_str());
        for check in &result.checks {
            let mark = if check.passed { "✓" } else { "✗" };
            match &check.message {
                Some(msg) => println!("  {mark} {} ({msg})", check.name),
                None => println!("  {mark} {}", check.name),
            }
        }
        if !result.passed {
            return Err(ForgeError::CheckpointFailed(phase.to_string()).into());
        }
    }

    // History is a best-effort record: a write failure must not block
    // completing the phase.
    if let Some(started_at) = state.phase_started_at {
        if let Err(e) = PhaseHistory::record(phase, started_at).save(root) {
            tracing::warn!("failed to write phase history: {e}");
        }
    }

    state.set_phase_status(phase, PhaseStatus::Completed);
    state.add_activity(format!("Completed phase: {phase}"));
    state.current_phase = None;
    state.phase_started_at = None;
    state.save(root).context("failed to save state")?;

    println!("Completed phase: {phase}");
    match phase.next() {
        Some(next) => println!("Next: forge phase start {next}"),
        None => println!("All phases complete."),
    }
    Ok(())
}
