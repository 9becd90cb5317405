//! Bridge adapter — talks to an external bridge process over HTTP + SSE.
//!
//! A bridge is a sidecar that fronts some backend Troupe has no native
//! adapter for. It exposes two endpoints on a local port:
//!
//! - `POST /v1/complete` — JSON in, JSON out (`{content, tool_calls, usage}`)
//! - `POST /v1/stream`   — JSON in, SSE out
//!
//! The SSE frames carry tagged events close to the raw backend shape:
//! `content`, `tool_call_start` / `tool_call_delta` / `tool_call_end` (keyed
//! by a bridge-assigned block index), `done`, and `error`. This adapter
//! assembles the fragments exactly like the native adapters do and emits
//! only completed tool calls. Transport failures surface as `Error` events,
//! never as hung streams.
//!
//! Bridges have no distinct tool-result message shape, so tool-role
//! messages are synthesized into structured user messages referencing the
//! call_id.

use std::collections::HashMap;

use serde_json::Value;

use crate::anthropic::assemble_tool_call;
use crate::sse::sse_event_stream;
use crate::traits::{Completion, CompletionRequest, LlmProvider};
use crate::util::{from_reqwest, http_client};
use troupe_domain::config::ProviderConfig;
use troupe_domain::error::{Error, Result};
use troupe_domain::message::{Message, Role, ToolCall, Usage};
use troupe_domain::stream::{BoxStream, StreamEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter backed by an external bridge process.
pub struct BridgeProvider {
    id: String,
    base_url: String,
    default_model: Option<String>,
    client: reqwest::Client,
}

impl BridgeProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            default_model: cfg.default_model.clone(),
            client: http_client()?,
        })
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().flat_map(msg_to_bridge).collect();

        let mut body = serde_json::json!({
            "messages": messages,
        });
        if let Some(model) = req.model.clone().or_else(|| self.default_model.clone()) {
            body["model"] = Value::String(model);
        }
        if !req.tools.is_empty() {
            body["tools"] = serde_json::to_value(&req.tools).unwrap_or(Value::Null);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn msg_to_bridge(msg: &Message) -> Vec<Value> {
    match msg.role {
        Role::System => vec![serde_json::json!({"role": "system", "content": msg.content})],
        Role::User => vec![serde_json::json!({"role": "user", "content": msg.content})],
        Role::Assistant => {
            let mut v = serde_json::json!({"role": "assistant", "content": msg.content});
            if !msg.tool_calls.is_empty() {
                v["tool_calls"] = serde_json::to_value(&msg.tool_calls).unwrap_or(Value::Null);
            }
            vec![v]
        }
        // No distinct tool-result shape: synthesize structured user
        // messages, one per result, each referencing the call_id.
        Role::Tool => msg
            .tool_results
            .iter()
            .map(|tr| {
                serde_json::json!({
                    "role": "user",
                    "content": serde_json::json!({
                        "tool_result": {
                            "call_id": tr.call_id,
                            "content": tr.render(),
                            "is_error": tr.is_error(),
                        }
                    })
                    .to_string(),
                })
            })
            .collect(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE frame parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-stream assembly state, keyed by the bridge's block index.
struct StreamState {
    blocks: HashMap<u64, (String, String, String)>,
    done_emitted: bool,
}

impl StreamState {
    fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            done_emitted: false,
        }
    }
}

fn parse_bridge_sse(data: &str, state: &mut StreamState) -> Vec<StreamEvent> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return vec![StreamEvent::Error {
                message: format!("malformed bridge frame: {e}"),
            }]
        }
    };

    match v.get("type").and_then(|t| t.as_str()).unwrap_or("") {
        "content" => {
            let text = v.get("text").and_then(|t| t.as_str()).unwrap_or("");
            if text.is_empty() {
                Vec::new()
            } else {
                vec![StreamEvent::Content {
                    text: text.to_string(),
                }]
            }
        }

        "tool_call_start" => {
            let idx = v.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            let call_id = v.get("id").and_then(|i| i.as_str()).unwrap_or("").to_string();
            let name = v
                .get("tool_name")
                .and_then(|n| n.as_str())
                .unwrap_or("")
                .to_string();
            state.blocks.insert(idx, (call_id, name, String::new()));
            Vec::new()
        }

        "tool_call_delta" => {
            let idx = v.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            if let Some(fragment) = v.get("fragment").and_then(|f| f.as_str()) {
                if let Some(block) = state.blocks.get_mut(&idx) {
                    block.2.push_str(fragment);
                }
            }
            Vec::new()
        }

        "tool_call_end" => {
            let idx = v.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            match state.blocks.remove(&idx) {
                Some((call_id, name, args)) => vec![StreamEvent::ToolCall {
                    call: assemble_tool_call(call_id, name, &args),
                }],
                None => {
                    tracing::warn!(index = idx, "bridge ended an unknown tool-call block");
                    Vec::new()
                }
            }
        }

        "done" => {
            if state.done_emitted {
                Vec::new()
            } else {
                state.done_emitted = true;
                let usage = v
                    .get("usage")
                    .cloned()
                    .and_then(|u| serde_json::from_value::<Usage>(u).ok());
                vec![StreamEvent::Done { usage }]
            }
        }

        "error" => {
            let msg = v
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown bridge error");
            vec![StreamEvent::Error {
                message: msg.to_string(),
            }]
        }

        other => {
            tracing::debug!(frame_type = %other, "ignoring unknown bridge frame");
            Vec::new()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for BridgeProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn supports_tools(&self) -> bool {
        true
    }

    async fn complete(&self, req: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/v1/complete", self.base_url);
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "bridge complete request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let v: Value = serde_json::from_str(&resp_text)?;
        let tool_calls: Vec<ToolCall> = v
            .get("tool_calls")
            .cloned()
            .and_then(|t| serde_json::from_value(t).ok())
            .unwrap_or_default();
        Ok(Completion {
            content: v
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or("")
                .to_string(),
            tool_calls,
            usage: v
                .get("usage")
                .cloned()
                .and_then(|u| serde_json::from_value(u).ok()),
        })
    }

    async fn stream(&self, req: CompletionRequest) -> Result<BoxStream<'static, StreamEvent>> {
        let url = format!("{}/v1/stream", self.base_url);
        let body = self.build_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "bridge stream request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }

        let mut state = StreamState::new();
        Ok(sse_event_stream(resp, move |data| {
            parse_bridge_sse(data, &mut state)
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
