use crate::output::print_json;
use anyhow::Context;
use forge_core::{history, ProjectState};
use std::path::Path;

pub fn run(root: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let state = ProjectState::load(root).context("failed to load state")?;

    let start = state.activities.len().saturating_sub(limit);
    let recent = &state.activities[start..];

    if json {
        return print_json(&recent);
    }

    if recent.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }

    for activity in recent {
        let stamp = activity.timestamp.format("%Y-%m-%d %H:%M:%S");
        match activity.phase {
            Some(phase) => println!("{stamp}  [{phase}]  {}", activity.message),
            None => println!("{stamp}  {}", activity.message),
        }
    }

    let records = history::load_all(root).unwrap_or_default();
    if !records.is_empty() {
        println!("\nCompleted phases:");
        for record in records {
            println!(
                "  {}  {}s  (finished {})",
                record.phase,
                record.duration_secs,
                record.completed_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    Ok(())
}
