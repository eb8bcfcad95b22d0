use crate::executor::{build_phase_prompt, PHASE_OUTPUT_FILE};
use anyhow::Context;
use forge_core::config::ProjectConfig;
use forge_core::lock::StateLock;
use forge_core::{io, paths, ForgeError, ProjectState};
use forge_provider::{CompletionRequest, ProviderManager};
use futures::StreamExt;
use std::path::Path;

/// Execute the current phase's configured provider once and write the output
/// artifact.
pub fn run(root: &Path, prompt: Option<&str>, stream: bool) -> anyhow::Result<()> {
    let mut lock = StateLock::new(root)?;
    let _guard = lock.lock()?;

    let mut state = ProjectState::load(root).context("failed to load state")?;
    let config = ProjectConfig::load(root).context("failed to load config")?;
    let phase = state.current_phase.ok_or(ForgeError::NoActivePhase)?;

    let tool = config.tool_for_phase(phase);
    let manager = ProviderManager::from_config(&config);
    let request = CompletionRequest::new(
        prompt
            .map(String::from)
            .unwrap_or_else(|| build_phase_prompt(phase)),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let content = runtime.block_on(async {
        let provider = manager
            .get(tool)
            .with_context(|| format!("provider '{tool}' is not configured or not enabled"))?;

        if stream {
            let mut chunks = provider.execute_stream(request).await?;
            let mut out = String::new();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                print!("{}", chunk.content);
                out.push_str(&chunk.content);
                if chunk.done {
                    break;
                }
            }
            println!();
            anyhow::Ok(out)
        } else {
            let response = provider.execute(request).await?;
            println!("{}", response.content);
            anyhow::Ok(response.content)
        }
    })?;

    let dir = paths::artifacts_dir(root, phase);
    io::ensure_dir(&dir)?;
    let path = dir.join(PHASE_OUTPUT_FILE);
    io::atomic_write(&path, content.as_bytes())?;

    state.add_activity(format!("Ran provider '{tool}' for phase {phase}"));
    state.save(root).context("failed to save state")?;

    eprintln!("wrote: {}", path.display());
    eprintln!("expected artifacts:");
    for check in forge_core::checkpoint::validate_artifacts(root, phase) {
        let mark = if check.passed { "✓" } else { "✗" };
        eprintln!("  {mark} {}", check.name);
    }
    Ok(())
}
