//! Shared domain types for Troupe.
//!
//! Everything here is provider- and transport-agnostic: the conversation
//! model, the streaming event model, agent definitions, server config, and
//! the shared error type used across all crates.

pub mod agentdef;
pub mod config;
pub mod error;
pub mod message;
pub mod stream;

pub use agentdef::{AgentDefinition, ModelConfig, ToolFilter};
pub use error::{Error, Result};
pub use message::{Message, Role, ToolCall, ToolDefinition, ToolResult, Usage};
pub use stream::{BoxStream, StreamEvent};
