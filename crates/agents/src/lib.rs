//! Agents: definitions bound to provider instances, the shared pool, and
//! the hot-reload machinery for the agents directory.

pub mod agent;
pub mod loader;
pub mod pool;
pub mod watcher;

pub use agent::Agent;
pub use pool::AgentPool;
pub use watcher::AgentWatcher;
