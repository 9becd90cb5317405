//! Provider-agnostic streaming events.
//!
//! Every provider adapter translates its backend's wire events into this
//! model. Tool calls are only ever emitted *completed* — partial-argument
//! assembly is internal to each adapter.

use std::pin::Pin;

use serde::Serialize;

use crate::message::{ToolCall, Usage};

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted during LLM streaming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// An incremental text delta. Concatenating all `Content` events of a
    /// stream reconstructs the full assistant message body.
    #[serde(rename = "content")]
    Content { text: String },

    /// A completed tool call with fully assembled argument JSON.
    #[serde(rename = "tool_call")]
    ToolCall { call: ToolCall },

    /// Stream terminator. Exactly one per stream.
    #[serde(rename = "done")]
    Done { usage: Option<Usage> },

    /// Terminal failure; no further events follow.
    #[serde(rename = "error")]
    Error { message: String },
}
