//! The permission gate every workspace-side tool call passes through.

use serde_json::Value;

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// Policy consulted before any workspace tool executes.
pub trait PermissionChecker: Send + Sync {
    fn check(&self, tool_name: &str, arguments: &Value) -> Decision;
}

/// Permits everything. For trusted local development only.
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(&self, _tool_name: &str, _arguments: &Value) -> Decision {
        Decision::Allow
    }
}

/// Permits only the named tools; everything else is denied.
pub struct AllowList {
    allowed: Vec<String>,
}

impl AllowList {
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionChecker for AllowList {
    fn check(&self, tool_name: &str, _arguments: &Value) -> Decision {
        if self.allowed.iter().any(|a| a == tool_name) {
            Decision::Allow
        } else {
            Decision::Deny(format!("tool '{tool_name}' is not permitted in this workspace"))
        }
    }
}
