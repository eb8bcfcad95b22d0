use anyhow::Context;
use forge_core::config::ProjectConfig;
use forge_core::{io, paths, ForgeError, Phase, ProjectState};
use forge_provider::{CompletionRequest, ProviderManager};
use std::path::Path;
use std::time::Duration;

/// Deadline for the optional scaffold generation call.
const SCAFFOLD_TIMEOUT: Duration = Duration::from_secs(60);

pub fn run(root: &Path, name: Option<&str>, template: &str, scaffold: bool) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    if config_path.exists() {
        return Err(ForgeError::AlreadyInitialized(config_path.display().to_string()).into());
    }

    let project_name = match name {
        Some(n) => n.to_string(),
        None => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string()),
    };

    println!("Initializing forge in: {}", root.display());

    io::ensure_dir(&paths::forge_dir(root))?;
    io::ensure_dir(&paths::history_dir(root))?;
    for phase in Phase::all() {
        let dir = paths::artifacts_dir(root, *phase);
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let config = ProjectConfig::default_for(&project_name, template);
    config.save(root).context("failed to write config.yaml")?;
    println!("  created: .forge/config.yaml");

    let mut state = ProjectState::new();
    state.save(root).context("failed to write state.yaml")?;
    println!("  created: .forge/state.yaml");
    println!("  created: .forge/artifacts/<phase>/ ({} phases)", Phase::all().len());

    if scaffold {
        generate_scaffold(root, &config, &project_name);
    }

    println!("\nProject '{project_name}' initialized.");
    println!("Next: forge phase start discovery");
    Ok(())
}

/// Ask the default provider for a scaffold outline, bounded by a deadline.
/// Any failure here is a warning: the project is already initialized.
fn generate_scaffold(root: &Path, config: &ProjectConfig, project_name: &str) {
    let prompt = format!(
        "Create a project scaffold outline for a new software project named '{}'{}. \
         List the directory layout, key files, and a one-line purpose for each.",
        project_name,
        if config.template.is_empty() {
            String::new()
        } else {
            format!(" using the '{}' template", config.template)
        }
    );

    let outcome = (|| -> anyhow::Result<String> {
        let runtime = tokio::runtime::Runtime::new()?;
        let manager = ProviderManager::from_config(config);
        runtime.block_on(async {
            let provider = manager.default_provider()?;
            let response =
                tokio::time::timeout(SCAFFOLD_TIMEOUT, provider.execute(CompletionRequest::new(prompt)))
                    .await
                    .map_err(|_| {
                        anyhow::anyhow!(
                            "scaffold generation timed out after {}s",
                            SCAFFOLD_TIMEOUT.as_secs()
                        )
                    })??;
            Ok(response.content)
        })
    })();

    match outcome {
        Ok(content) => match io::atomic_write(&paths::scaffold_path(root), content.as_bytes()) {
            Ok(()) => println!("  created: .forge/scaffold.md"),
            Err(e) => eprintln!("warning: failed to write scaffold: {e}"),
        },
        Err(e) => eprintln!("warning: scaffold generation failed: {e:#}"),
    }
}
