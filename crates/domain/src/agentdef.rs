//! Agent definitions — the on-disk shape of an agent, independent of the
//! provider instance it is later bound to.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ModelConfig
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which provider/model an agent speaks through and with what sampling
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model_name: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
}

fn d_temperature() -> f32 {
    0.7
}
fn d_max_tokens() -> u32 {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model_name: String::new(),
            temperature: d_temperature(),
            max_tokens: d_max_tokens(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolFilter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tool allow/deny lists. Deny always wins over allow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolFilter {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub denied: Vec<String>,
}

impl ToolFilter {
    /// Check whether the given tool name is permitted by this filter.
    pub fn allows(&self, tool_name: &str) -> bool {
        if self.denied.iter().any(|d| d == tool_name) {
            return false;
        }
        self.allowed.iter().any(|a| a == tool_name)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentDefinition
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A named agent: system prompt, model binding, and tool filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub model: ModelConfig,
    #[serde(default)]
    pub tools: ToolFilter,
}

impl AgentDefinition {
    /// Validate the definition. Returns the reasons it is unusable, empty
    /// when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.name.is_empty() {
            issues.push("agent name must not be empty".into());
        }
        if self.system_prompt.is_empty() {
            issues.push(format!("agent '{}': system_prompt must not be empty", self.name));
        }
        if self.model.provider.is_empty() {
            issues.push(format!("agent '{}': model.provider must not be empty", self.name));
        }
        if self.model.model_name.is_empty() {
            issues.push(format!("agent '{}': model.model_name must not be empty", self.name));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            issues.push(format!(
                "agent '{}': temperature {} out of range [0, 2]",
                self.name, self.model.temperature
            ));
        }
        if self.model.max_tokens == 0 {
            issues.push(format!("agent '{}': max_tokens must be > 0", self.name));
        }
        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
