//! The `active_tool` — the discover-then-execute bridge between the tool
//! surface agents see and the capability registry.
//!
//! Three actions:
//! - `search_skills {query, max_results}` — ranked skill summaries
//! - `load_skill {skill_name}` — full body + enumerated resources
//! - `execute {capability, parameters}` — run a registered capability

use std::sync::Arc;

use serde_json::Value;

use troupe_domain::{Error, Result};
use troupe_skills::SkillIndex;

use crate::registry::{CapabilityRegistry, ExecutionLocation, Tool, ToolContext};

pub struct ActiveTool {
    index: Arc<SkillIndex>,
    capabilities: Arc<CapabilityRegistry>,
}

impl ActiveTool {
    pub fn new(index: Arc<SkillIndex>, capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            index,
            capabilities,
        }
    }

    fn search_skills(&self, args: &Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Other("search_skills requires 'query'".into()))?;
        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let hits = self.index.search(query, max_results);
        let count = hits.len();
        Ok(serde_json::json!({
            "results": hits,
            "count": count,
        }))
    }

    fn load_skill(&self, args: &Value) -> Result<Value> {
        let name = args
            .get("skill_name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Other("load_skill requires 'skill_name'".into()))?;
        let loaded = self.index.load_skill(name)?;
        serde_json::to_value(loaded).map_err(Error::Json)
    }

    async fn execute_capability(&self, ctx: &ToolContext, args: &Value) -> Result<Value> {
        let capability = args
            .get("capability")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Other("execute requires 'capability'".into()))?;
        let parameters = args
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        self.capabilities.execute(capability, ctx, parameters).await
    }
}

#[async_trait::async_trait]
impl Tool for ActiveTool {
    fn name(&self) -> &str {
        "active_tool"
    }

    fn description(&self) -> &str {
        "Discover and use skills. Actions: search_skills (find skills matching a query), \
         load_skill (read a skill's full instructions and resources), \
         execute (run a named capability with parameters)."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["search_skills", "load_skill", "execute"],
                    "description": "Which action to perform"
                },
                "query": { "type": "string", "description": "Search query (search_skills)" },
                "max_results": { "type": "integer", "description": "Max results, capped at 10 (search_skills)" },
                "skill_name": { "type": "string", "description": "Skill to load (load_skill)" },
                "capability": { "type": "string", "description": "Capability to run (execute)" },
                "parameters": { "type": "object", "description": "Capability parameters (execute)" }
            },
            "required": ["action"]
        })
    }

    fn execution_location(&self) -> ExecutionLocation {
        ExecutionLocation::Server
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<Value> {
        let action = arguments
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("");
        match action {
            "search_skills" => self.search_skills(&arguments),
            "load_skill" => self.load_skill(&arguments),
            "execute" => self.execute_capability(ctx, &arguments).await,
            other => Err(Error::Other(format!(
                "unknown active_tool action '{other}' (expected search_skills, load_skill, or execute)"
            ))),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn skill_dir(root: &std::path::Path, name: &str, desc: &str, caps: &[&str]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let caps_yaml = caps
            .iter()
            .map(|c| format!("  - {c}"))
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {desc}\ncategory: capability\ncapabilities:\n{caps_yaml}\n---\n# {name} usage\n"),
        )
        .unwrap();
    }

    fn active_tool_with_skills(root: &std::path::Path) -> ActiveTool {
        let index = Arc::new(SkillIndex::load(root).unwrap());
        ActiveTool::new(index, Arc::new(CapabilityRegistry::new()))
    }

    #[tokio::test]
    async fn search_skills_ranks_by_score() {
        let tmp = tempfile::tempdir().unwrap();
        skill_dir(
            tmp.path(),
            "filesystem-operations",
            "read and write files",
            &["read_file", "write_file"],
        );
        skill_dir(tmp.path(), "shell-execution", "run shell commands", &["run_command"]);

        let tool = active_tool_with_skills(tmp.path());
        let out = tool
            .execute(
                &ToolContext::default(),
                serde_json::json!({"action": "search_skills", "query": "read files"}),
            )
            .await
            .unwrap();

        let results = out["results"].as_array().unwrap();
        assert_eq!(results[0]["name"], "filesystem-operations");
        assert!(results[0]["score"].as_f64().unwrap() >= 7.0);
    }

    #[tokio::test]
    async fn load_skill_returns_body_and_resources() {
        let tmp = tempfile::tempdir().unwrap();
        skill_dir(tmp.path(), "git-workflow", "git operations", &["run_command"]);
        std::fs::create_dir_all(tmp.path().join("git-workflow/scripts")).unwrap();
        std::fs::write(tmp.path().join("git-workflow/scripts/rebase.sh"), "#!/bin/sh").unwrap();

        let tool = active_tool_with_skills(tmp.path());
        let out = tool
            .execute(
                &ToolContext::default(),
                serde_json::json!({"action": "load_skill", "skill_name": "git-workflow"}),
            )
            .await
            .unwrap();

        assert!(out["body"].as_str().unwrap().contains("# git-workflow usage"));
        assert_eq!(out["scripts"], serde_json::json!(["rebase.sh"]));
    }

    #[tokio::test]
    async fn unknown_action_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = active_tool_with_skills(tmp.path());
        let err = tool
            .execute(
                &ToolContext::default(),
                serde_json::json!({"action": "self_destruct"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown active_tool action"));
    }

    #[tokio::test]
    async fn execute_routes_to_capability() {
        struct Upper;
        #[async_trait::async_trait]
        impl Tool for Upper {
            fn name(&self) -> &str {
                "uppercase"
            }
            fn description(&self) -> &str {
                "uppercases text"
            }
            fn parameters(&self) -> Value {
                serde_json::json!({"type": "object"})
            }
            fn execution_location(&self) -> ExecutionLocation {
                ExecutionLocation::Server
            }
            async fn execute(&self, _ctx: &ToolContext, arguments: Value) -> Result<Value> {
                let text = arguments.get("text").and_then(Value::as_str).unwrap_or("");
                Ok(serde_json::json!({"text": text.to_uppercase()}))
            }
        }

        let mut caps = CapabilityRegistry::new();
        caps.register(Arc::new(Upper)).unwrap();
        let tool = ActiveTool::new(Arc::new(SkillIndex::empty()), Arc::new(caps));

        let out = tool
            .execute(
                &ToolContext::default(),
                serde_json::json!({
                    "action": "execute",
                    "capability": "uppercase",
                    "parameters": {"text": "hi"}
                }),
            )
            .await
            .unwrap();
        assert_eq!(out["text"], "HI");
    }

    #[tokio::test]
    async fn execute_unknown_capability_errors() {
        let tool = ActiveTool::new(
            Arc::new(SkillIndex::empty()),
            Arc::new(CapabilityRegistry::new()),
        );
        let err = tool
            .execute(
                &ToolContext::default(),
                serde_json::json!({"action": "execute", "capability": "nope"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
