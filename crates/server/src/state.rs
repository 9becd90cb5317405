use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use troupe_agents::AgentPool;
use troupe_domain::config::Config;
use troupe_providers::ProviderRegistry;
use troupe_sessions::SessionStore;
use troupe_skills::SkillIndex;
use troupe_tools::ToolRegistry;

use crate::orchestrator::Orchestrator;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────
    pub config: Arc<Config>,
    pub providers: Arc<ProviderRegistry>,
    pub orchestrator: Arc<Orchestrator>,

    // ── Registries ────────────────────────────────────────────────
    pub pool: Arc<AgentPool>,
    pub tools: Arc<ToolRegistry>,
    pub skills: Arc<SkillIndex>,

    // ── Sessions ──────────────────────────────────────────────────
    pub store: Arc<SessionStore>,
    /// Session ids with a running orchestration task (at most one each).
    pub active_runs: Arc<Mutex<HashSet<String>>>,

    // ── Security (startup-computed) ───────────────────────────────
    /// SHA-256 hash of the channel pre-shared token. `None` = dev mode
    /// (open access).
    pub channel_token_hash: Option<Vec<u8>>,
}
