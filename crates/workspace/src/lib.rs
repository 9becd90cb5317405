//! The thin workspace client.
//!
//! Connects to a Troupe server over HTTP plus the per-session WebSocket
//! channel, reports project context, executes workspace-side tool calls
//! under a permission policy, and prints progress.

pub mod backoff;
pub mod client;
pub mod executor;
pub mod permission;

pub use backoff::ReconnectBackoff;
pub use client::{RunOutcome, WorkspaceClient};
pub use executor::WorkspaceExecutor;
pub use permission::{AllowList, AllowAll, PermissionChecker};
