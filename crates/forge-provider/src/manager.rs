//! Construction and lookup of providers from project configuration.

use crate::anthropic::AnthropicProvider;
use crate::exec::ExecutableProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::Provider;
use crate::{ProviderError, Result};
use forge_core::config::{ProjectConfig, ProviderSettings};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Owns one provider instance per enabled config entry. Built once from a
/// [`ProjectConfig`]; lookups hand out trait objects.
pub struct ProviderManager {
    providers: BTreeMap<String, Box<dyn Provider>>,
    default_name: String,
}

impl ProviderManager {
    pub fn from_config(config: &ProjectConfig) -> Self {
        let mut providers: BTreeMap<String, Box<dyn Provider>> = BTreeMap::new();

        for entry in config.providers.iter().filter(|e| e.enabled) {
            let provider: Box<dyn Provider> = match &entry.settings {
                ProviderSettings::Openai {
                    endpoint,
                    model,
                    api_key,
                    api_key_env,
                    max_tokens,
                } => Box::new(OpenAiProvider::new(
                    &entry.name,
                    endpoint,
                    model,
                    api_key,
                    api_key_env,
                    *max_tokens,
                )),
                ProviderSettings::Anthropic {
                    model,
                    api_key,
                    api_key_env,
                    max_tokens,
                } => Box::new(AnthropicProvider::new(
                    &entry.name,
                    model,
                    api_key,
                    api_key_env,
                    *max_tokens,
                )),
                ProviderSettings::Ollama { endpoint, model } => {
                    Box::new(OllamaProvider::new(&entry.name, endpoint, model))
                }
                ProviderSettings::Executable {
                    executable,
                    args,
                    env,
                    work_dir,
                    timeout_seconds,
                    interactive,
                } => Box::new(ExecutableProvider::new(
                    &entry.name,
                    executable,
                    args.clone(),
                    env.clone(),
                    work_dir.as_ref().map(PathBuf::from),
                    *timeout_seconds,
                    *interactive,
                )),
            };
            providers.insert(entry.name.clone(), provider);
        }

        Self {
            providers,
            default_name: config.default_provider.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&dyn Provider> {
        self.providers
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::NotAvailable(name.to_string()))
    }

    pub fn default_provider(&self) -> Result<&dyn Provider> {
        self.get(&self.default_name)
    }

    /// Configured provider names, enabled entries only.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Names of providers whose backend currently answers the availability
    /// probe. Probes run sequentially; the Ollama probe has a short timeout.
    pub async fn available(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for (name, provider) in &self.providers {
            if provider.is_available().await {
                out.push(name.as_str());
            }
        }
        out
    }
}
