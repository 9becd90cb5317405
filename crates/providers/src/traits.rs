use troupe_domain::error::Result;
use troupe_domain::message::{Message, ToolCall, ToolDefinition, Usage};
use troupe_domain::stream::{BoxStream, StreamEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request.
///
/// `model`, `temperature`, and `max_tokens` are optional here; the agent
/// fills unset fields from its definition before the provider is called.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
    /// The conversation messages to send.
    pub messages: Vec<Message>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
}

/// A provider-agnostic non-streaming completion.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Textual content of the response.
    pub content: String,
    /// Tool calls emitted by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage information.
    pub usage: Option<Usage>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every LLM adapter must implement.
///
/// `complete` is the non-streaming convenience used by the coordinator,
/// moderator, and synthesizer; `stream` drives agent turns. Stream items are
/// plain [`StreamEvent`]s — failures after the stream has started arrive as
/// `StreamEvent::Error` (terminal), so a consumer never needs to distinguish
/// transport errors from backend-reported ones.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// A unique identifier for this provider instance.
    fn name(&self) -> &str;

    /// Whether this provider/model combination supports tool use.
    fn supports_tools(&self) -> bool;

    /// Send a completion request and wait for the full response.
    async fn complete(&self, req: CompletionRequest) -> Result<Completion>;

    /// Send a completion request and return a stream of events.
    ///
    /// An `Err` return means the request could not be started (connect
    /// failure, non-2xx status); once a stream is returned, all failures are
    /// delivered in-band as `StreamEvent::Error`.
    async fn stream(&self, req: CompletionRequest) -> Result<BoxStream<'static, StreamEvent>>;
}
