use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::config::{ProjectConfig, ProviderSettings};
use forge_provider::ProviderManager;
use std::path::Path;

#[derive(Subcommand)]
pub enum ProviderSubcommand {
    /// List configured providers and whether each is reachable
    List,

    /// List the models a provider can serve
    Models { name: String },
}

pub fn run(root: &Path, subcommand: ProviderSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        ProviderSubcommand::List => list(root, json),
        ProviderSubcommand::Models { name } => models(root, &name, json),
    }
}

fn kind(settings: &ProviderSettings) -> &'static str {
    match settings {
        ProviderSettings::Openai { .. } => "openai",
        ProviderSettings::Anthropic { .. } => "anthropic",
        ProviderSettings::Ollama { .. } => "ollama",
        ProviderSettings::Executable { .. } => "executable",
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = ProjectConfig::load(root).context("failed to load config")?;
    let manager = ProviderManager::from_config(&config);

    let runtime = tokio::runtime::Runtime::new()?;
    let available = runtime.block_on(manager.available());

    if json {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            name: &'a str,
            kind: &'static str,
            enabled: bool,
            available: bool,
            default: bool,
        }
        let rows: Vec<Row> = config
            .providers
            .iter()
            .map(|entry| Row {
                name: &entry.name,
                kind: kind(&entry.settings),
                enabled: entry.enabled,
                available: available.contains(&entry.name.as_str()),
                default: entry.name == config.default_provider,
            })
            .collect();
        return print_json(&rows);
    }

    let rows: Vec<Vec<String>> = config
        .providers
        .iter()
        .map(|entry| {
            let status = if !entry.enabled {
                "disabled"
            } else if available.contains(&entry.name.as_str()) {
                "available"
            } else {
                "unavailable"
            };
            let default = if entry.name == config.default_provider {
                "*"
            } else {
                ""
            };
            vec![
                format!("{}{}", entry.name, default),
                kind(&entry.settings).to_string(),
                status.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "TYPE", "STATUS"], rows);
    Ok(())
}

fn models(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let config = ProjectConfig::load(root).context("failed to load config")?;
    let manager = ProviderManager::from_config(&config);
    let provider = manager
        .get(name)
        .with_context(|| format!("provider '{name}' is not configured or not enabled"))?;

    let runtime = tokio::runtime::Runtime::new()?;
    let models = runtime.block_on(provider.models());

    if json {
        return print_json(&models);
    }

    if models.is_empty() {
        println!("No model list for '{name}'.");
    } else {
        for model in models {
            println!("{model}");
        }
    }
    Ok(())
}
