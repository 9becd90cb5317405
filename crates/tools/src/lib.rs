//! Tool and capability registries.
//!
//! Two orthogonal registries exist: the **tool registry** (what LLMs see)
//! and the **capability registry** (primitive server-side operations). The
//! [`active_tool`] bridges them — it is the only tool most agents need,
//! exposing skill search, skill loading, and capability execution behind a
//! small stable surface while capabilities evolve independently.

pub mod active_tool;
pub mod builtin;
pub mod registry;

pub use active_tool::ActiveTool;
pub use registry::{
    CapabilityRegistry, ExecutionLocation, Tool, ToolContext, ToolRegistry, WorkspaceTool,
};
