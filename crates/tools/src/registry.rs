//! The [`Tool`] trait and the two registries built on it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use troupe_domain::agentdef::ToolFilter;
use troupe_domain::message::ToolDefinition;
use troupe_domain::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where a tool call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionLocation {
    /// Executed in-process by the orchestrator.
    Server,
    /// Delegated over the session channel to the connected workspace.
    Workspace,
}

/// Context provided to every server-side tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: String,
    /// Name of the agent that emitted the call.
    pub agent: String,
}

/// A named, schema-carrying executable.
///
/// `execute` is only invoked when `execution_location` is `Server`;
/// workspace-located entries exist so the registry can advertise their
/// schemas to agents.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> Value;
    fn execution_location(&self) -> ExecutionLocation;
    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WorkspaceTool — schema-only entry executed by the client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A tool whose execution is delegated to the workspace client. The server
/// only carries its schema; `execute` is unreachable through the dispatch
/// path and fails loudly if called anyway.
pub struct WorkspaceTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait::async_trait]
impl Tool for WorkspaceTool {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn parameters(&self) -> Value {
        self.parameters.clone()
    }
    fn execution_location(&self) -> ExecutionLocation {
        ExecutionLocation::Workspace
    }
    async fn execute(&self, _ctx: &ToolContext, _arguments: Value) -> Result<Value> {
        Err(Error::Other(format!(
            "workspace tool '{}' cannot execute on the server",
            self.name
        )))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The tools advertised to LLMs, keyed by name.
///
/// A `BTreeMap` keeps iteration (and therefore the advertised tool order)
/// deterministic.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails on duplicate names.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(Error::Duplicate(format!("tool '{name}'")));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// The filtered, deterministically-ordered definitions advertised to a
    /// provider on behalf of an agent: included iff the agent's allowed set
    /// contains the name and the denied set does not.
    pub fn get_allowed(&self, filter: &ToolFilter) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .filter(|t| filter.allows(t.name()))
            .map(|t| t.definition())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CapabilityRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Primitive server operations reachable through `active_tool.execute`.
/// Never advertised to LLMs directly.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Arc<dyn Tool>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. Fails on duplicate names.
    pub fn register(&mut self, capability: Arc<dyn Tool>) -> Result<()> {
        let name = capability.name().to_string();
        if self.capabilities.contains_key(&name) {
            return Err(Error::Duplicate(format!("capability '{name}'")));
        }
        self.capabilities.insert(name, capability);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.capabilities.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    /// Look up and run a capability.
    pub async fn execute(&self, name: &str, ctx: &ToolContext, arguments: Value) -> Result<Value> {
        let capability = self
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(format!("capability '{name}'")))?;
        capability.execute(ctx, arguments).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn ws_tool(name: &str) -> Arc<dyn Tool> {
        Arc::new(WorkspaceTool {
            name: name.into(),
            description: format!("{name} tool"),
            parameters: serde_json::json!({"type": "object"}),
        })
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(ws_tool("write_file")).unwrap();
        let err = registry.register(ws_tool("write_file")).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[test]
    fn get_allowed_filters_and_orders() {
        let mut registry = ToolRegistry::new();
        for name in ["write_file", "active_tool", "run_command", "read_file"] {
            registry.register(ws_tool(name)).unwrap();
        }

        let filter = ToolFilter {
            allowed: vec!["write_file".into(), "read_file".into(), "run_command".into()],
            denied: vec!["run_command".into()],
        };
        let defs = registry.get_allowed(&filter);
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        // Name-ascending, denied wins.
        assert_eq!(names, vec!["read_file", "write_file"]);
    }

    #[test]
    fn get_allowed_is_deterministic() {
        let mut registry = ToolRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(ws_tool(name)).unwrap();
        }
        let filter = ToolFilter {
            allowed: vec!["a".into(), "b".into(), "c".into()],
            denied: vec![],
        };
        let first = registry.get_allowed(&filter);
        let second = registry.get_allowed(&filter);
        assert_eq!(first, second);
        assert_eq!(first[0].name, "a");
    }

    #[tokio::test]
    async fn workspace_tool_refuses_server_execution() {
        let tool = ws_tool("read_file");
        let err = tool
            .execute(&ToolContext::default(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot execute on the server"));
    }

    #[tokio::test]
    async fn capability_registry_executes_by_name() {
        struct Echo;
        #[async_trait::async_trait]
        impl Tool for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "echoes arguments"
            }
            fn parameters(&self) -> Value {
                serde_json::json!({"type": "object"})
            }
            fn execution_location(&self) -> ExecutionLocation {
                ExecutionLocation::Server
            }
            async fn execute(&self, _ctx: &ToolContext, arguments: Value) -> Result<Value> {
                Ok(arguments)
            }
        }

        let mut caps = CapabilityRegistry::new();
        caps.register(Arc::new(Echo)).unwrap();

        let out = caps
            .execute("echo", &ToolContext::default(), serde_json::json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!({"x": 1}));

        let err = caps
            .execute("missing", &ToolContext::default(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
