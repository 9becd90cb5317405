//! LLM provider adapters.
//!
//! Each adapter translates between Troupe's internal types and one backend's
//! wire format. The contract every adapter honors:
//!
//! - system-role messages are routed to the backend's system channel when the
//!   backend takes one, otherwise passed through;
//! - tool-role messages convert to the backend's tool-result encoding keyed
//!   by call_id;
//! - streamed tool-call argument fragments are assembled per content block
//!   and emitted as a single completed [`StreamEvent::ToolCall`] — never with
//!   partial arguments;
//! - transport failures surface as [`StreamEvent::Error`], never as hung
//!   streams.

pub mod anthropic;
pub mod bridge;
pub mod openai_compat;
pub mod registry;
pub mod sse;
pub mod traits;
pub mod util;

pub use registry::{ProviderInitError, ProviderRegistry};
pub use traits::{Completion, CompletionRequest, LlmProvider};
