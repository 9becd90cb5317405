//! Built-in capabilities and the stock tool definitions.
//!
//! Server capabilities here are primitives reachable through
//! `active_tool.execute`. Workspace tool definitions are schema-only
//! entries executed by the connected workspace client.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use serde_json::Value;

use troupe_domain::{Error, Result};

use crate::registry::{
    CapabilityRegistry, ExecutionLocation, Tool, ToolContext, ToolRegistry, WorkspaceTool,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// http_fetch capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const FETCH_TIMEOUT_SECS: u64 = 20;
const FETCH_MAX_BYTES: usize = 1024 * 1024;

/// Returns `true` if the IP belongs to a private, loopback, link-local, or
/// otherwise non-public range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || is_v4_shared_address(v4)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || is_v6_unique_local(v6)
                || is_v6_link_local(v6)
        }
    }
}

/// 100.64.0.0/10 — shared address space (RFC 6598 / CGNAT).
fn is_v4_shared_address(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    octets[0] == 100 && (octets[1] & 0xC0) == 64
}

/// Unique-local addresses: fc00::/7.
fn is_v6_unique_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xFE00) == 0xFC00
}

/// Link-local addresses: fe80::/10.
fn is_v6_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xFFC0) == 0xFE80
}

/// Fetch a URL with strict limits: hard timeout, response size cap, and a
/// guard against private-network targets.
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent("troupe-http-fetch/0.1")
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Tool for HttpFetch {
    fn name(&self) -> &str {
        "http_fetch"
    }

    fn description(&self) -> &str {
        "Fetch a public http(s) URL. Responses are truncated at 1 MiB."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to fetch" }
            },
            "required": ["url"]
        })
    }

    fn execution_location(&self) -> ExecutionLocation {
        ExecutionLocation::Server
    }

    async fn execute(&self, _ctx: &ToolContext, arguments: Value) -> Result<Value> {
        let url_str = arguments
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Other("http_fetch requires 'url'".into()))?;

        let url: reqwest::Url = url_str
            .parse()
            .map_err(|e| Error::Other(format!("invalid url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Other(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        // Resolve the host up front and refuse private targets.
        let host = url
            .host_str()
            .ok_or_else(|| Error::Other("url has no host".into()))?;
        let port = url.port_or_known_default().unwrap_or(443);
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| Error::Http(format!("resolving {host}: {e}")))?;
        for addr in addrs {
            if is_private_ip(&addr.ip()) {
                return Err(Error::Auth(format!(
                    "refusing to fetch private address {}",
                    addr.ip()
                )));
            }
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Stream the body so an oversized response never lands in memory.
        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;
        let mut resp = resp;
        while let Some(chunk) = resp.chunk().await.map_err(|e| Error::Http(e.to_string()))? {
            let remaining = FETCH_MAX_BYTES - body.len();
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(serde_json::json!({
            "status": status,
            "content_type": content_type,
            "body": String::from_utf8_lossy(&body),
            "truncated": truncated,
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// current_time capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct CurrentTime;

#[async_trait::async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }
    fn description(&self) -> &str {
        "The current UTC time."
    }
    fn parameters(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}})
    }
    fn execution_location(&self) -> ExecutionLocation {
        ExecutionLocation::Server
    }
    async fn execute(&self, _ctx: &ToolContext, _arguments: Value) -> Result<Value> {
        let now = chrono::Utc::now();
        Ok(serde_json::json!({
            "iso8601": now.to_rfc3339(),
            "unix": now.timestamp(),
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace tool definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Schema-only entries for the tools the workspace client executes.
pub fn workspace_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WorkspaceTool {
            name: "read_file".into(),
            description: "Read a file from the workspace. Returns its contents.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the project root" }
                },
                "required": ["path"]
            }),
        }),
        Arc::new(WorkspaceTool {
            name: "write_file".into(),
            description: "Write content to a file in the workspace, creating parent directories."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the project root" },
                    "content": { "type": "string", "description": "Full file content" }
                },
                "required": ["path", "content"]
            }),
        }),
        Arc::new(WorkspaceTool {
            name: "list_dir".into(),
            description: "List files and directories at a workspace path.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path relative to the project root" }
                },
                "required": ["path"]
            }),
        }),
        Arc::new(WorkspaceTool {
            name: "run_command".into(),
            description: "Run a shell command in the workspace and return its output.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "Shell command to execute" },
                    "timeout_sec": { "type": "integer", "description": "Hard timeout in seconds" }
                },
                "required": ["command"]
            }),
        }),
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator tool schemas
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A registered tool whose effect lives entirely in the orchestrator. The
/// registry entry carries the schema; dispatch intercepts the call by name
/// before `execute` could run.
pub struct OrchestratorTool {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[async_trait::async_trait]
impl Tool for OrchestratorTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        self.description
    }
    fn parameters(&self) -> Value {
        self.parameters.clone()
    }
    fn execution_location(&self) -> ExecutionLocation {
        ExecutionLocation::Server
    }
    async fn execute(&self, _ctx: &ToolContext, _arguments: Value) -> Result<Value> {
        Err(Error::Other(format!(
            "'{}' is handled by the orchestrator",
            self.name
        )))
    }
}

pub fn collaborate_tool() -> Arc<dyn Tool> {
    Arc::new(OrchestratorTool {
        name: "collaborate",
        description: "Communicate with teammates: broadcast to the team, address one agent \
                      directly, ask for help, or declare the task complete.",
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["broadcast", "direct", "help", "complete"],
                    "description": "Kind of collaboration"
                },
                "message": { "type": "string", "description": "The message to deliver" },
                "to_agent": { "type": "string", "description": "Recipient agent (direct/help)" },
                "artifacts": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Paths of artifacts produced so far"
                }
            },
            "required": ["action", "message"]
        }),
    })
}

pub fn assemble_team_tool() -> Arc<dyn Tool> {
    Arc::new(OrchestratorTool {
        name: "assemble_team",
        description: "Select the team of agents for this task.",
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "agents": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Names of the agents to put on the team"
                },
                "reasoning": { "type": "string", "description": "Why this team" }
            },
            "required": ["agents"]
        }),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stock registry builders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the capability registry with the built-in server primitives.
pub fn build_capability_registry() -> Result<CapabilityRegistry> {
    let mut caps = CapabilityRegistry::new();
    caps.register(Arc::new(HttpFetch::new()?))?;
    caps.register(Arc::new(CurrentTime))?;
    Ok(caps)
}

/// Build the tool registry: the active_tool, the orchestrator tools, and
/// the workspace tool schemas.
pub fn build_tool_registry(active_tool: Arc<dyn Tool>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(active_tool)?;
    registry.register(collaborate_tool())?;
    registry.register(assemble_team_tool())?;
    for tool in workspace_tools() {
        registry.register(tool)?;
    }
    Ok(registry)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_ip_detection() {
        let private = [
            "127.0.0.1",
            "10.1.2.3",
            "192.168.0.10",
            "172.16.9.9",
            "169.254.1.1",
            "100.64.0.1",
            "::1",
            "fd00::1",
            "fe80::1",
        ];
        for ip in private {
            assert!(is_private_ip(&ip.parse().unwrap()), "{ip} should be private");
        }

        let public = ["1.1.1.1", "8.8.8.8", "2606:4700:4700::1111"];
        for ip in public {
            assert!(!is_private_ip(&ip.parse().unwrap()), "{ip} should be public");
        }
    }

    #[test]
    fn stock_registry_contains_expected_tools() {
        let caps = build_capability_registry().unwrap();
        assert_eq!(caps.names(), vec!["current_time", "http_fetch"]);

        let active = Arc::new(crate::active_tool::ActiveTool::new(
            Arc::new(troupe_skills::SkillIndex::empty()),
            Arc::new(caps),
        ));
        let registry = build_tool_registry(active).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "active_tool",
                "assemble_team",
                "collaborate",
                "list_dir",
                "read_file",
                "run_command",
                "write_file",
            ]
        );
    }

    #[tokio::test]
    async fn current_time_shape() {
        let out = CurrentTime
            .execute(&ToolContext::default(), serde_json::json!({}))
            .await
            .unwrap();
        assert!(out["iso8601"].is_string());
        assert!(out["unix"].is_i64());
    }

    #[tokio::test]
    async fn http_fetch_rejects_bad_scheme() {
        let fetch = HttpFetch::new().unwrap();
        let err = fetch
            .execute(
                &ToolContext::default(),
                serde_json::json!({"url": "ftp://example.com/x"}),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn orchestrator_tool_execute_is_unreachable() {
        let tool = collaborate_tool();
        let err = tool
            .execute(&ToolContext::default(), serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("handled by the orchestrator"));
    }
}
