use crate::output::{print_json, print_table};
use anyhow::Context;
use forge_core::config::ProjectConfig;
use forge_core::{Phase, PhaseStatus, ProjectState};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = ProjectState::load(root).context("failed to load state")?;
    let config = ProjectConfig::load(root).context("failed to load config")?;

    if json {
        #[derive(serde::Serialize)]
        struct PhaseRow<'a> {
            phase: &'a str,
            status: String,
            tool: &'a str,
        }

        #[derive(serde::Serialize)]
        struct Status<'a> {
            project: &'a str,
            current_phase: Option<&'a str>,
            completed: usize,
            total: usize,
            phases: Vec<PhaseRow<'a>>,
            last_activity: Option<&'a str>,
            auto_feedback: Option<&'a str>,
        }

        let phases: Vec<PhaseRow> = Phase::all()
            .iter()
            .map(|p| PhaseRow {
                phase: p.as_str(),
                status: state.phase_status(*p).to_string(),
                tool: config.tool_for_phase(*p),
            })
            .collect();

        return print_json(&Status {
            project: &config.name,
            current_phase: state.current_phase.map(|p| p.as_str()),
            completed: state.completed_count(),
            total: Phase::all().len(),
            phases,
            last_activity: state.activities.last().map(|a| a.message.as_str()),
            auto_feedback: state
                .auto
                .as_ref()
                .filter(|a| !a.feedback.is_empty())
                .map(|a| a.feedback.as_str()),
        });
    }

    println!("Project: {}", config.name);
    println!(
        "Progress: {}/{} phases completed",
        state.completed_count(),
        Phase::all().len()
    );
    match state.current_phase {
        Some(p) => println!("Current phase: {p}"),
        None => println!("Current phase: none"),
    }

    println!();
    let rows: Vec<Vec<String>> = Phase::all()
        .iter()
        .map(|p| {
            let status = state.phase_status(*p);
            let mark = match status {
                PhaseStatus::Completed => "✓",
                PhaseStatus::InProgress => "→",
                PhaseStatus::ValidationFailed => "✗",
                PhaseStatus::Pending => " ",
            };
            vec![
                mark.to_string(),
                p.as_str().to_string(),
                status.to_string(),
                config.tool_for_phase(*p).to_string(),
            ]
        })
        .collect();
    print_table(&["", "PHASE", "STATUS", "TOOL"], rows);

    if let Some(auto) = &state.auto {
        if !auto.feedback.is_empty() {
            println!("\nLast auto feedback: {}", auto.feedback);
        }
        if let Some(last) = auto.last_completed_phase {
            match last.next() {
                Some(next) => println!("Resume: forge auto (continues at {next})"),
                None => println!("Auto run finished all phases."),
            }
        }
    }

    Ok(())
}
