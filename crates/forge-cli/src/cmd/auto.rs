use crate::executor::{provider_validator, ProviderExecutor};
use anyhow::Context;
use forge_core::auto::AutoRunner;
use forge_core::config::ProjectConfig;
use forge_core::lock::StateLock;
use forge_core::{Phase, ProjectState};
use forge_provider::ProviderManager;
use std::path::Path;
use std::sync::Arc;

pub fn run(
    root: &Path,
    from: Option<&str>,
    until: Option<&str>,
    skip_validation: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut lock = StateLock::new(root)?;
    let _guard = lock.lock()?;

    let from = parse_phase(from)?;
    let until = parse_phase(until)?;

    let mut state = ProjectState::load(root).context("failed to load state")?;
    let config = ProjectConfig::load(root).context("failed to load config")?;
    let manager = Arc::new(ProviderManager::from_config(&config));

    let runtime = tokio::runtime::Runtime::new()?;
    let executor = ProviderExecutor::new(&manager, &config, root, runtime.handle().clone());

    let mut runner = AutoRunner::new(&mut state, root, Box::new(executor));
    if !skip_validation {
        runner = runner.with_validator(provider_validator(
            Arc::clone(&manager),
            runtime.handle().clone(),
        ));
    }

    if dry_run {
        let phases = runner.phase_range(from, until)?;
        println!("Would run {} phase(s):", phases.len());
        for phase in phases {
            println!("  {} ({})", phase, config.tool_for_phase(phase));
        }
        return Ok(());
    }

    let (can_resume, last, _) = runner.resume_info();
    if from.is_none() && can_resume {
        if let Some(last) = last {
            println!("Resuming after last completed phase: {last}");
        }
    }

    runner.run(from, until, skip_validation)?;

    println!("\nAuto run complete.");
    Ok(())
}

fn parse_phase(name: Option<&str>) -> anyhow::Result<Option<Phase>> {
    name.map(|n| n.parse::<Phase>().map_err(anyhow::Error::from))
        .transpose()
}
