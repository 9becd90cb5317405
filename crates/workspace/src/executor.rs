//! Workspace-side tool execution.
//!
//! Every call is gated by the [`PermissionChecker`] and confined to the
//! project root; denials and failures become `ToolResult.error`, never a
//! crash of the client.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use troupe_domain::message::{ToolCall, ToolResult};

use crate::permission::{Decision, PermissionChecker};

/// Default timeout for `run_command` when the caller supplies none.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

pub struct WorkspaceExecutor {
    root: PathBuf,
    permissions: Arc<dyn PermissionChecker>,
}

impl WorkspaceExecutor {
    pub fn new(root: impl Into<PathBuf>, permissions: Arc<dyn PermissionChecker>) -> Self {
        Self {
            root: root.into(),
            permissions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Execute one workspace tool call.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        if let Decision::Deny(reason) = self.permissions.check(&call.tool_name, &call.arguments) {
            return ToolResult::err(&call.id, format!("permission denied: {reason}"));
        }

        let outcome = match call.tool_name.as_str() {
            "read_file" => self.read_file(&call.arguments),
            "write_file" => self.write_file(&call.arguments),
            "list_dir" => self.list_dir(&call.arguments),
            "run_command" => self.run_command(&call.arguments).await,
            other => Err(format!("unknown workspace tool '{other}'")),
        };

        match outcome {
            Ok(value) => ToolResult::ok(&call.id, value),
            Err(message) => ToolResult::err(&call.id, message),
        }
    }

    /// Resolve a path argument inside the project root. Absolute paths and
    /// parent traversal are rejected.
    fn resolve(&self, raw: &str) -> Result<PathBuf, String> {
        let path = Path::new(raw);
        if path.is_absolute() {
            return Err(format!("absolute paths are not allowed: {raw}"));
        }
        for component in path.components() {
            if matches!(component, Component::ParentDir) {
                return Err(format!("path traversal blocked: {raw}"));
            }
        }
        Ok(self.root.join(path))
    }

    fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
        args.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("missing required argument: {key}"))
    }

    fn read_file(&self, args: &Value) -> Result<Value, String> {
        let path = self.resolve(Self::str_arg(args, "path")?)?;
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("reading {}: {e}", path.display()))?;
        Ok(serde_json::json!({ "content": content }))
    }

    fn write_file(&self, args: &Value) -> Result<Value, String> {
        let raw = Self::str_arg(args, "path")?;
        let content = Self::str_arg(args, "content")?;
        let path = self.resolve(raw)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("creating {}: {e}", parent.display()))?;
        }
        std::fs::write(&path, content).map_err(|e| format!("writing {}: {e}", path.display()))?;
        Ok(serde_json::json!({ "path": raw, "bytes": content.len() }))
    }

    fn list_dir(&self, args: &Value) -> Result<Value, String> {
        let path = self.resolve(Self::str_arg(args, "path")?)?;
        let read_dir =
            std::fs::read_dir(&path).map_err(|e| format!("listing {}: {e}", path.display()))?;

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.path().is_dir();
            entries.push(serde_json::json!({ "name": name, "dir": is_dir }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
        Ok(serde_json::json!({ "entries": entries }))
    }

    async fn run_command(&self, args: &Value) -> Result<Value, String> {
        let command = Self::str_arg(args, "command")?;
        let timeout = args
            .get("timeout_sec")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT);

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| format!("command timed out after {}s", timeout.as_secs()))?
            .map_err(|e| format!("spawning command: {e}"))?;

        Ok(serde_json::json!({
            "exit_code": output.status.code(),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
