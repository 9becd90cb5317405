//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, Together, and any other
//! endpoint that follows the OpenAI chat completions contract. Streamed
//! tool-call arguments arrive as string fragments keyed by the entry's
//! `index` inside `delta.tool_calls`; they are buffered per index and each
//! call is emitted completed when the choice finishes.

use std::collections::HashMap;

use serde_json::Value;

use crate::anthropic::assemble_tool_call;
use crate::sse::sse_event_stream;
use crate::traits::{Completion, CompletionRequest, LlmProvider};
use crate::util::{from_reqwest, http_client, resolve_api_key};
use troupe_domain::config::ProviderConfig;
use troupe_domain::error::{Error, Result};
use troupe_domain::message::{Message, Role, ToolCall, ToolDefinition, Usage};
use troupe_domain::stream::{BoxStream, StreamEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for any OpenAI-compatible API endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the deserialized provider config.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(cfg)?;
        let default_model = cfg.default_model.clone().unwrap_or_else(|| "gpt-4o".into());

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            client: http_client()?,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url).header("Content-Type", "application/json");
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }

    fn build_chat_body(&self, req: &CompletionRequest, stream: bool) -> Value {
        let messages: Vec<Value> = req.messages.iter().flat_map(msg_to_openai).collect();

        let mut body = serde_json::json!({
            "model": req.model.clone().unwrap_or_else(|| self.default_model.clone()),
            "messages": messages,
            "stream": stream,
        });

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(tools);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        if stream {
            body["stream_options"] = serde_json::json!({"include_usage": true});
        }
        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert one internal message into OpenAI wire messages.
///
/// A tool-role message holding N results expands into N `role: tool`
/// messages, since the OpenAI contract takes one `tool_call_id` each.
fn msg_to_openai(msg: &Message) -> Vec<Value> {
    match msg.role {
        Role::System => vec![serde_json::json!({
            "role": "system",
            "content": msg.content,
        })],
        Role::User => vec![serde_json::json!({
            "role": "user",
            "content": msg.content,
        })],
        Role::Assistant => vec![assistant_to_openai(msg)],
        Role::Tool => msg
            .tool_results
            .iter()
            .map(|tr| {
                serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tr.call_id,
                    "content": tr.render(),
                })
            })
            .collect(),
    }
}

fn assistant_to_openai(msg: &Message) -> Value {
    let mut obj = serde_json::json!({"role": "assistant"});

    if msg.content.is_empty() {
        obj["content"] = Value::Null;
    } else {
        obj["content"] = Value::String(msg.content.clone());
    }

    if !msg.tool_calls.is_empty() {
        let tool_calls: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.tool_name,
                        "arguments": tc.arguments.to_string(),
                    }
                })
            })
            .collect();
        obj["tool_calls"] = Value::Array(tool_calls);
    }
    obj
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(provider: &str, body: &Value) -> Result<Completion> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: provider.into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Provider {
        provider: provider.into(),
        message: "no message in choice".into(),
    })?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    Ok(Completion {
        content,
        tool_calls: parse_openai_tool_calls(message),
        usage: body.get("usage").and_then(parse_openai_usage),
    })
}

fn parse_openai_tool_calls(message: &Value) -> Vec<ToolCall> {
    let arr = match message.get("tool_calls").and_then(|v| v.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };
    arr.iter()
        .filter_map(|tc| {
            let call_id = tc.get("id")?.as_str()?.to_string();
            let func = tc.get("function")?;
            let tool_name = func.get("name")?.as_str()?.to_string();
            let args_str = func.get("arguments").and_then(|v| v.as_str()).unwrap_or("");
            Some(assemble_tool_call(call_id, tool_name, args_str))
        })
        .collect()
}

fn parse_openai_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        input_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        output_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE streaming helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-stream state for assembling tool calls from indexed fragments.
struct StreamState {
    /// tool-call index -> (call_id, tool name, argument buffer).
    fragments: HashMap<u64, (String, String, String)>,
    /// Index arrival order, for deterministic emission.
    order: Vec<u64>,
    usage: Option<Usage>,
    done_emitted: bool,
}

impl StreamState {
    fn new() -> Self {
        Self {
            fragments: HashMap::new(),
            order: Vec::new(),
            usage: None,
            done_emitted: false,
        }
    }

    /// Emit all assembled tool calls in arrival order and clear the buffers.
    fn flush_tool_calls(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for idx in self.order.drain(..) {
            if let Some((call_id, name, args)) = self.fragments.remove(&idx) {
                events.push(StreamEvent::ToolCall {
                    call: assemble_tool_call(call_id, name, &args),
                });
            }
        }
        events
    }
}

/// Parse a single OpenAI SSE data payload into zero or more stream events.
fn parse_openai_sse(data: &str, state: &mut StreamState) -> Vec<StreamEvent> {
    // The `[DONE]` sentinel closes the stream; any buffered calls were
    // already flushed by the finish_reason chunk, but flush defensively in
    // case the backend skipped it.
    if data.trim() == "[DONE]" {
        let mut events = state.flush_tool_calls();
        if !state.done_emitted {
            state.done_emitted = true;
            events.push(StreamEvent::Done {
                usage: state.usage.clone(),
            });
        }
        return events;
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return vec![StreamEvent::Error {
                message: format!("malformed SSE payload: {e}"),
            }]
        }
    };

    if let Some(usage) = v.get("usage").and_then(parse_openai_usage) {
        state.usage = Some(usage);
    }

    let choice = match v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
    {
        Some(c) => c,
        // Usage-only chunk (stream_options.include_usage).
        None => return Vec::new(),
    };

    let mut events = Vec::new();
    let delta = choice.get("delta").unwrap_or(&Value::Null);

    // Text delta.
    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            events.push(StreamEvent::Content {
                text: text.to_string(),
            });
        }
    }

    // Tool-call fragments, keyed by index.
    if let Some(tc_arr) = delta.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_arr {
            let idx = tc.get("index").and_then(|v| v.as_u64()).unwrap_or(0);

            if !state.fragments.contains_key(&idx) {
                state.order.push(idx);
                state.fragments.insert(idx, Default::default());
            }
            let Some(entry) = state.fragments.get_mut(&idx) else {
                continue;
            };

            if let Some(id) = tc.get("id").and_then(|v| v.as_str()) {
                entry.0 = id.to_string();
            }
            if let Some(name) = tc
                .get("function")
                .and_then(|f| f.get("name"))
                .and_then(|v| v.as_str())
            {
                entry.1.push_str(name);
            }
            if let Some(args) = tc
                .get("function")
                .and_then(|f| f.get("arguments"))
                .and_then(|v| v.as_str())
            {
                entry.2.push_str(args);
            }
        }
    }

    // Finish: the choice is complete, so every buffered call is fully
    // accumulated and can be emitted. `Done` itself waits for the `[DONE]`
    // sentinel so a trailing usage-only chunk still lands in it.
    if choice.get("finish_reason").and_then(|f| f.as_str()).is_some() {
        events.extend(state.flush_tool_calls());
    }

    events
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn supports_tools(&self) -> bool {
        true
    }

    async fn complete(&self, req: CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(&req, false);

        tracing::debug!(provider = %self.id, url = %url, "openai-compat complete request");

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
        parse_chat_response(&self.id, &resp_json)
    }

    async fn stream(&self, req: CompletionRequest) -> Result<BoxStream<'static, StreamEvent>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(&req, true);

        tracing::debug!(provider = %self.id, url = %url, "openai-compat stream request");

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
            parse_openai_sse(data, &mut state)
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
