//! Bridge between the synchronous phase runner and the async provider stack.
//!
//! The runner calls `execute(phase)`; this resolves the phase's configured
//! tool, blocks on the provider call, and writes the output artifact. The
//! validator closure wraps the default provider the same way.

use forge_core::auto::{PhaseExecutor, ValidatorFn};
use forge_core::config::ProjectConfig;
use forge_core::{ForgeError, Phase};
use forge_provider::{CompletionRequest, ProviderManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;

/// The file each automated phase writes its provider output to, under the
/// phase's artifact directory.
pub const PHASE_OUTPUT_FILE: &str = "output.md";

pub struct ProviderExecutor<'a> {
    manager: &'a ProviderManager,
    config: &'a ProjectConfig,
    root: PathBuf,
    handle: Handle,
}

impl<'a> ProviderExecutor<'a> {
    pub fn new(
        manager: &'a ProviderManager,
        config: &'a ProjectConfig,
        root: &Path,
        handle: Handle,
    ) -> Self {
        Self {
            manager,
            config,
            root: root.to_path_buf(),
            handle,
        }
    }
}

impl PhaseExecutor for ProviderExecutor<'_> {
    fn execute(&mut self, phase: Phase) -> forge_core::Result<()> {
        let tool = self.config.tool_for_phase(phase);
        let provider = self
            .manager
            .get(tool)
            .map_err(|e| execution_error(phase, e))?;

        println!("  [{phase}] running provider '{tool}'");
        let request = CompletionRequest::new(build_phase_prompt(phase));
        let response = self
            .handle
            .block_on(provider.execute(request))
            .map_err(|e| execution_error(phase, e))?;

        let dir = forge_core::paths::artifacts_dir(&self.root, phase);
        forge_core::io::ensure_dir(&dir)?;
        forge_core::io::atomic_write(&dir.join(PHASE_OUTPUT_FILE), response.content.as_bytes())?;
        println!(
            "  [{phase}] wrote {} ({}s)",
            dir.join(PHASE_OUTPUT_FILE).display(),
            response.duration.as_secs()
        );
        Ok(())
    }
}

fn execution_error(phase: Phase, e: impl std::fmt::Display) -> ForgeError {
    ForgeError::Execution {
        phase: phase.to_string(),
        message: e.to_string(),
    }
}

/// Work prompt handed to the phase's provider: the phase descriptor plus the
/// artifacts it is expected to produce.
pub fn build_phase_prompt(phase: Phase) -> String {
    let spec = phase.spec();
    format!(
        "You are working on the '{}' phase of a software project.\n\
         Description: {}\n\
         Expected artifacts: {}\n\
         Completion criteria: {}\n\n\
         Produce the phase's artifacts as markdown.",
        spec.name,
        spec.description,
        spec.artifacts.join(", "),
        spec.criteria.join(", "),
    )
}

/// Build the AI-validation closure over the default provider. The runner
/// hands it a pattern name and the validation input; the pattern rides as
/// the system prompt.
pub fn provider_validator(manager: Arc<ProviderManager>, handle: Handle) -> ValidatorFn {
    Box::new(move |pattern: &str, input: &str| {
        let provider = manager.default_provider().map_err(validator_error)?;
        let request = CompletionRequest::new(input).with_system(pattern);
        let response = handle
            .block_on(provider.execute(request))
            .map_err(validator_error)?;
        Ok(response.content)
    })
}

fn validator_error(e: impl std::fmt::Display) -> ForgeError {
    ForgeError::Execution {
        phase: "validation".to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_prompt_names_artifacts_and_criteria() {
        let prompt = build_phase_prompt(Phase::Discovery);
        assert!(prompt.contains("'discovery' phase"));
        assert!(prompt.contains("requirements.md"));
        assert!(prompt.contains("Requirements document exists"));
    }
}
