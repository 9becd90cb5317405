//! The per-session bidirectional channel: WebSocket transport plus the
//! pending-call correlation map that binds server-originated `tool_call`
//! frames to workspace `tool_result` frames.

pub mod pending;
pub mod ws;

pub use pending::PendingMap;
