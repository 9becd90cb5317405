//! Session-channel protocol: the JSON frames exchanged between the server
//! and a connected workspace over the per-session WebSocket.
//!
//! Every frame is `{ "type": <string>, "payload": <object> }`.
//! `tool_call.arguments` is passed through as opaque JSON — intermediate
//! layers never reformat it; only the final executor parses it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use troupe_domain::message::{Message, ToolCall, ToolResult};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client → server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Frames a workspace client sends to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Kick off a run for this session.
    Start {
        task: String,
        #[serde(default)]
        project_info: Value,
    },
    /// Result of a workspace-side tool call, correlated by `call_id`.
    ToolResult { result: ToolResult },
    /// Abort the running orchestration.
    Cancel {},
    /// Application-level heartbeat.
    Ping {},
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server → client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Frames the server sends to a workspace client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A transcript message (assistant turns, out-of-band system lines).
    AgentMessage { message: Message },
    /// A tool invocation. `server_side: false` means the workspace must
    /// execute it and reply with a `tool_result` frame.
    ToolCall { call: ToolCall, server_side: bool },
    /// Informational: the outcome of a server-side tool call.
    ToolResult { result: ToolResult },
    /// The run finished; the synthesis is attached.
    Complete {
        summary: String,
        artifacts: Vec<String>,
        message_count: usize,
    },
    /// The run aborted.
    Error { message: String },
    /// Heartbeat response.
    Pong {},
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
