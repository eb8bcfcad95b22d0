use crate::error::{ForgeError, Result};
use crate::paths;
use crate::phase::Phase;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Provider settings
// ---------------------------------------------------------------------------

/// Per-backend configuration payload. Closed over the known backend kinds so
/// construction is checked at compile time instead of failing on a runtime
/// "unknown provider type" string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// OpenAI-shaped chat-completion HTTP API.
    Openai {
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        api_key: String,
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
    },
    /// Anthropic-shaped messages HTTP API.
    Anthropic {
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        api_key: String,
        #[serde(default = "default_anthropic_key_env")]
        api_key_env: String,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
    },
    /// Local Ollama daemon.
    Ollama {
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    /// External CLI wrapped as a subprocess.
    Executable {
        executable: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        work_dir: Option<String>,
        #[serde(default = "default_exec_timeout")]
        timeout_seconds: u64,
        #[serde(default)]
        interactive: bool,
    },
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_ollama_model() -> String {
    "llama3.2".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_exec_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub settings: ProviderSettings,
}

fn default_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,
    pub version: String,
    pub default_provider: String,
    pub providers: Vec<ProviderEntry>,
    /// Per-phase tool overrides; phases not listed use the catalog default.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phases: BTreeMap<Phase, String>,
}

impl ProjectConfig {
    /// Stock configuration for a new project: the four CLI tools the phase
    /// catalog references, plus HTTP backends the user must opt into.
    pub fn default_for(name: impl Into<String>, template: impl Into<String>) -> Self {
        let exec = |name: &str, cmd: &str, enabled: bool| ProviderEntry {
            name: name.to_string(),
            enabled,
            settings: ProviderSettings::Executable {
                executable: cmd.to_string(),
                args: Vec::new(),
                env: BTreeMap::new(),
                work_dir: None,
                timeout_seconds: default_exec_timeout(),
                interactive: false,
            },
        };

        Self {
            name: name.into(),
            description: String::new(),
            template: template.into(),
            version: "1.0.0".to_string(),
            default_provider: "gemini".to_string(),
            providers: vec![
                exec("gemini", "gemini", true),
                exec("codex", "codex", true),
                exec("opencode", "opencode", true),
                exec("fabric", "fabric", true),
                ProviderEntry {
                    name: "claude".to_string(),
                    enabled: false,
                    settings: ProviderSettings::Anthropic {
                        model: default_anthropic_model(),
                        api_key: String::new(),
                        api_key_env: default_anthropic_key_env(),
                        max_tokens: default_max_tokens(),
                    },
                },
                ProviderEntry {
                    name: "openai".to_string(),
                    enabled: false,
                    settings: ProviderSettings::Openai {
                        endpoint: default_openai_endpoint(),
                        model: default_openai_model(),
                        api_key: String::new(),
                        api_key_env: default_openai_key_env(),
                        max_tokens: default_max_tokens(),
                    },
                },
                ProviderEntry {
                    name: "ollama".to_string(),
                    enabled: false,
                    settings: ProviderSettings::Ollama {
                        endpoint: default_ollama_endpoint(),
                        model: default_ollama_model(),
                    },
                },
            ],
            phases: BTreeMap::new(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ForgeError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let expanded = expand_env_vars(&data);
        let config: ProjectConfig = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Resolve the tool driving a phase: explicit override first, then the
    /// catalog default.
    pub fn tool_for_phase(&self, phase: Phase) -> &str {
        self.phases
            .get(&phase)
            .map(String::as_str)
            .unwrap_or(phase.spec().primary_tool)
    }
}

// ---------------------------------------------------------------------------
// Environment expansion
// ---------------------------------------------------------------------------

static ENV_RE: OnceLock<Regex> = OnceLock::new();

fn env_re() -> &'static Regex {
    ENV_RE.get_or_init(|| Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(:-([^}]*))?\}").unwrap())
}

/// Expand `${VAR}` and `${VAR:-default}` references before YAML parsing.
/// Unset variables without a default expand to the empty string.
pub fn expand_env_vars(input: &str) -> String {
    env_re()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            match std::env::var(&caps[1]) {
                Ok(v) => v,
                Err(_) => caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = ProjectConfig::default_for("my-project", "cli");
        config.phases.insert(Phase::Testing, "claude".to_string());
        config.save(dir.path()).unwrap();

        let loaded = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_without_config_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(ForgeError::NotInitialized)
        ));
    }

    #[test]
    fn tagged_provider_settings_parse() {
        let yaml = "\
name: proj
version: 1.0.0
default_provider: local
providers:
  - name: local
    type: ollama
    endpoint: http://localhost:11434
    model: mistral
  - name: helper
    type: executable
    executable: /usr/local/bin/helper
    timeout_seconds: 60
";
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.providers[0].settings,
            ProviderSettings::Ollama { .. }
        ));
        assert!(matches!(
            &config.providers[1].settings,
            ProviderSettings::Executable { timeout_seconds: 60, .. }
        ));
    }

    #[test]
    fn unknown_provider_type_rejected_at_parse() {
        let yaml = "\
name: proj
version: 1.0.0
default_provider: x
providers:
  - name: x
    type: carrier-pigeon
";
        assert!(serde_yaml::from_str::<ProjectConfig>(yaml).is_err());
    }

    #[test]
    fn tool_for_phase_respects_overrides() {
        let mut config = ProjectConfig::default_for("p", "");
        assert_eq!(config.tool_for_phase(Phase::Implementation), "codex");
        config
            .phases
            .insert(Phase::Implementation, "claude".to_string());
        assert_eq!(config.tool_for_phase(Phase::Implementation), "claude");
    }

    #[test]
    fn env_expansion() {
        std::env::set_var("FORGE_TEST_KEY", "sk-abc");
        assert_eq!(expand_env_vars("key: ${FORGE_TEST_KEY}"), "key: sk-abc");
        assert_eq!(
            expand_env_vars("model: ${FORGE_TEST_UNSET:-llama3.2}"),
            "model: llama3.2"
        );
        assert_eq!(expand_env_vars("key: ${FORGE_TEST_UNSET2}"), "key: ");
    }

    #[test]
    fn defaults_include_catalog_primary_tools() {
        let config = ProjectConfig::default_for("p", "");
        for phase in Phase::all() {
            let tool = config.tool_for_phase(*phase);
            assert!(config.provider(tool).is_some(), "missing provider: {tool}");
        }
    }
}
