//! Server configuration — deserialized from `troupe.toml`.
//!
//! Validation is severity-tagged: warnings are logged at startup, errors
//! abort it.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    /// Env var holding the optional pre-shared session-channel token.
    /// Unset or empty → open access (dev mode).
    #[serde(default = "d_channel_token_env")]
    pub channel_token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            channel_token_env: d_channel_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "d_agents_path")]
    pub path: PathBuf,
    /// Name of the coordinator agent. Must exist in the agents directory.
    #[serde(default = "d_coordinator")]
    pub coordinator: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            path: d_agents_path(),
            coordinator: d_coordinator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    #[serde(default = "d_skills_path")]
    pub path: PathBuf,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            path: d_skills_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_store_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: d_store_root(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenaiCompat,
    Bridge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider id referenced by agent definitions (`model.provider`).
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    /// Env var the API key is read from. Bridge providers may omit it.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.providers.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "no providers configured".into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for pc in &self.providers {
            if !seen.insert(pc.id.as_str()) {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    message: format!("duplicate provider id '{}'", pc.id),
                });
            }
            if pc.base_url.is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    message: format!("provider '{}': base_url must not be empty", pc.id),
                });
            }
            if pc.kind != ProviderKind::Bridge && pc.api_key_env.is_none() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Warning,
                    message: format!(
                        "provider '{}': no api_key_env configured, requests will be unauthenticated",
                        pc.id
                    ),
                });
            }
        }

        if self.agents.coordinator.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "agents.coordinator must not be empty".into(),
            });
        }

        issues
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    7700
}
fn d_channel_token_env() -> String {
    "TROUPE_CHANNEL_TOKEN".into()
}
fn d_agents_path() -> PathBuf {
    PathBuf::from("agents")
}
fn d_coordinator() -> String {
    "coordinator".into()
}
fn d_skills_path() -> PathBuf {
    PathBuf::from("skills")
}
fn d_store_root() -> PathBuf {
    PathBuf::from("data")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_has_provider_error() {
        let config = Config::default();
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.message.contains("no providers")));
    }

    #[test]
    fn duplicate_provider_ids_rejected() {
        let config: Config = toml::from_str(
            r#"
            [[providers]]
            id = "main"
            kind = "anthropic"
            base_url = "https://api.anthropic.com"
            api_key_env = "ANTHROPIC_API_KEY"

            [[providers]]
            id = "main"
            kind = "openai_compat"
            base_url = "http://localhost:11434/v1"
            api_key_env = "OLLAMA_KEY"
            "#,
        )
        .unwrap();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.message.contains("duplicate provider id")));
    }

    #[test]
    fn minimal_valid_config() {
        let config: Config = toml::from_str(
            r#"
            [[providers]]
            id = "main"
            kind = "anthropic"
            base_url = "https://api.anthropic.com"
            api_key_env = "ANTHROPIC_API_KEY"
            "#,
        )
        .unwrap();
        assert!(config
            .validate()
            .iter()
            .all(|i| i.severity != ConfigSeverity::Error));
        assert_eq!(config.server.port, 7700);
        assert_eq!(config.agents.coordinator, "coordinator");
    }

    #[test]
    fn bridge_provider_needs_no_key() {
        let config: Config = toml::from_str(
            r#"
            [[providers]]
            id = "bridge"
            kind = "bridge"
            base_url = "http://127.0.0.1:9400"
            "#,
        )
        .unwrap();
        assert!(config.validate().iter().all(|i| i.severity != ConfigSeverity::Error));
    }
}
