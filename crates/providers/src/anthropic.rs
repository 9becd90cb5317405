//! Anthropic-native adapter.
//!
//! Implements the Anthropic Messages API including tool use and streaming.
//! Anthropic-specific structure handled here: system messages go in a
//! separate top-level `system` field, tool results are user messages with
//! `tool_result` content blocks, and streamed tool-call arguments arrive as
//! `input_json_delta` fragments keyed by content-block index.

use std::collections::HashMap;

use serde_json::Value;

use crate::sse::sse_event_stream;
use crate::traits::{Completion, CompletionRequest, LlmProvider};
use crate::util::{from_reqwest, http_client, resolve_api_key};
use troupe_domain::config::ProviderConfig;
use troupe_domain::error::{Error, Result};
use troupe_domain::message::{Message, Role, ToolCall, ToolDefinition, Usage};
use troupe_domain::stream::{BoxStream, StreamEvent};

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for the Anthropic Messages API.
pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new provider from the deserialized provider config.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(cfg)?;
        let default_model = cfg
            .default_model
            .clone()
            .unwrap_or_else(|| "claude-sonnet-4-20250514".into());

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            client: http_client()?,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
    }

    fn build_messages_body(&self, req: &CompletionRequest, stream: bool) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        // Separate out system messages.
        let mut system_parts: Vec<String> = Vec::new();
        let mut api_messages: Vec<Value> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.clone()),
                Role::User => api_messages.push(serde_json::json!({
                    "role": "user",
                    "content": msg.content,
                })),
                Role::Assistant => api_messages.push(assistant_msg_to_anthropic(msg)),
                // Anthropic expects tool results as user messages with
                // tool_result content blocks.
                Role::Tool => api_messages.push(tool_results_to_anthropic(msg)),
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
            "stream": stream,
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_anthropic).collect();
            body["tools"] = Value::Array(tools);
        }

        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body["max_tokens"] = serde_json::json!(req.max_tokens.unwrap_or(4096));

        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn assistant_msg_to_anthropic(msg: &Message) -> Value {
    let mut content: Vec<Value> = Vec::new();
    if !msg.content.is_empty() {
        content.push(serde_json::json!({
            "type": "text",
            "text": msg.content,
        }));
    }
    for tc in &msg.tool_calls {
        content.push(serde_json::json!({
            "type": "tool_use",
            "id": tc.id,
            "name": tc.tool_name,
            "input": tc.arguments,
        }));
    }
    serde_json::json!({
        "role": "assistant",
        "content": content,
    })
}

fn tool_results_to_anthropic(msg: &Message) -> Value {
    let content: Vec<Value> = msg
        .tool_results
        .iter()
        .map(|tr| {
            serde_json::json!({
                "type": "tool_result",
                "tool_use_id": tr.call_id,
                "content": tr.render(),
                "is_error": tr.is_error(),
            })
        })
        .collect();
    serde_json::json!({
        "role": "user",
        "content": content,
    })
}

fn tool_to_anthropic(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_anthropic_response(body: &Value) -> Completion {
    let empty = Vec::new();
    let content_arr = body
        .get("content")
        .and_then(|v| v.as_array())
        .unwrap_or(&empty);

    let mut text_parts: Vec<String> = Vec::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    for block in content_arr {
        match block.get("type").and_then(|v| v.as_str()).unwrap_or("") {
            "text" => {
                if let Some(t) = block.get("text").and_then(|v| v.as_str()) {
                    text_parts.push(t.to_string());
                }
            }
            "tool_use" => {
                tool_calls.push(ToolCall {
                    id: block
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    tool_name: block
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    arguments: block.get("input").cloned().unwrap_or(Value::Null),
                });
            }
            _ => {}
        }
    }

    Completion {
        content: text_parts.join(""),
        tool_calls,
        usage: body.get("usage").and_then(parse_anthropic_usage),
    }
}

fn parse_anthropic_usage(v: &Value) -> Option<Usage> {
    let input = v.get("input_tokens")?.as_u64()? as u32;
    let output = v.get("output_tokens")?.as_u64()? as u32;
    Some(Usage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming SSE helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-stream state for assembling tool calls from content blocks.
///
/// Anthropic keys argument fragments by content-block index; a block's
/// `ToolCall` event is emitted only when the block stops and its buffer is
/// fully accumulated.
struct StreamState {
    /// block index -> (call_id, tool name, argument JSON buffer).
    active_blocks: HashMap<u64, (String, String, String)>,
    usage: Option<Usage>,
    done_emitted: bool,
}

impl StreamState {
    fn new() -> Self {
        Self {
            active_blocks: HashMap::new(),
            usage: None,
            done_emitted: false,
        }
    }
}

/// Parse a single Anthropic SSE data payload into zero or more stream events.
fn parse_anthropic_sse(data: &str, state: &mut StreamState) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            events.push(StreamEvent::Error {
                message: format!("malformed SSE payload: {e}"),
            });
            return events;
        }
    };

    match v.get("type").and_then(|v| v.as_str()).unwrap_or("") {
        "message_start" => {
            if let Some(msg) = v.get("message") {
                state.usage = msg.get("usage").and_then(parse_anthropic_usage);
            }
        }

        "content_block_start" => {
            let idx = v.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            if let Some(block) = v.get("content_block") {
                if block.get("type").and_then(|v| v.as_str()) == Some("tool_use") {
                    let call_id = block
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    let name = block
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    state.active_blocks.insert(idx, (call_id, name, String::new()));
                }
            }
        }

        "content_block_delta" => {
            let idx = v.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            if let Some(delta) = v.get("delta") {
                match delta.get("type").and_then(|v| v.as_str()).unwrap_or("") {
                    "text_delta" => {
                        if let Some(text) = delta.get("text").and_then(|v| v.as_str()) {
                            if !text.is_empty() {
                                events.push(StreamEvent::Content {
                                    text: text.to_string(),
                                });
                            }
                        }
                    }
                    "input_json_delta" => {
                        if let Some(partial) = delta.get("partial_json").and_then(|v| v.as_str()) {
                            if let Some(block) = state.active_blocks.get_mut(&idx) {
                                block.2.push_str(partial);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        "content_block_stop" => {
            let idx = v.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
            if let Some((call_id, tool_name, args_str)) = state.active_blocks.remove(&idx) {
                events.push(StreamEvent::ToolCall {
                    call: assemble_tool_call(call_id, tool_name, &args_str),
                });
            }
        }

        "message_delta" => {
            if let Some(usage_val) = v.get("usage") {
                if let Some(output) = usage_val.get("output_tokens").and_then(|v| v.as_u64()) {
                    if let Some(ref mut u) = state.usage {
                        u.output_tokens = output as u32;
                        u.total_tokens = u.input_tokens + u.output_tokens;
                    }
                }
            }
        }

        "message_stop" => {
            if !state.done_emitted {
                state.done_emitted = true;
                events.push(StreamEvent::Done {
                    usage: state.usage.clone(),
                });
            }
        }

        "error" => {
            let msg = v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            events.push(StreamEvent::Error {
                message: msg.to_string(),
            });
        }

        _ => {
            // ping or unknown event types — ignore.
        }
    }

    events
}

/// Parse an accumulated argument buffer into a completed [`ToolCall`].
///
/// Empty buffers and unparseable JSON both yield `Value::Null` arguments so
/// the orchestrator's sanitation pass drops the call before dispatch.
pub(crate) fn assemble_tool_call(call_id: String, tool_name: String, args_str: &str) -> ToolCall {
    let arguments = if args_str.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(args_str) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    call_id = %call_id,
                    tool = %tool_name,
                    error = %e,
                    "tool call arguments are not valid JSON"
                );
                Value::Null
            }
        }
    };
    ToolCall {
        id: call_id,
        tool_name,
        arguments,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn supports_tools(&self) -> bool {
        true
    }

    async fn complete(&self, req: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_messages_body(&req, false);

        tracing::debug!(provider = %self.id, url = %url, "anthropic complete request");

        let resp = self
            .authed_post(&url)
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

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        Ok(parse_anthropic_response(&resp_json))
    }

    async fn stream(&self, req: CompletionRequest) -> Result<BoxStream<'static, StreamEvent>> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_messages_body(&req, true);

        tracing::debug!(provider = %self.id, url = %url, "anthropic stream request");

        let resp = self
            .authed_post(&url)
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
            parse_anthropic_sse(data, &mut state)
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
