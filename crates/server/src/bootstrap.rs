//! Ordered startup: config validation, providers, skills, tools, agents,
//! store, orchestrator. Each failure here is a startup failure (exit 1).

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use troupe_agents::watcher::AgentBinder;
use troupe_agents::{Agent, AgentPool, AgentWatcher};
use troupe_domain::config::{Config, ConfigSeverity};
use troupe_providers::ProviderRegistry;
use troupe_sessions::SessionStore;
use troupe_skills::{SkillIndex, SkillWatcher};
use troupe_tools::{builtin, ActiveTool};

use crate::orchestrator::Orchestrator;
use crate::state::AppState;

/// The built application plus the watchers that must stay alive for the
/// process lifetime.
pub struct Runtime {
    pub state: AppState,
    _skill_watcher: Option<SkillWatcher>,
    _agent_watcher: Option<AgentWatcher>,
}

pub fn build(config: Arc<Config>) -> anyhow::Result<Runtime> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── LLM providers ────────────────────────────────────────────────
    let providers = Arc::new(ProviderRegistry::from_config(&config.providers));
    if providers.is_empty() {
        anyhow::bail!("no LLM providers initialized");
    }
    tracing::info!(providers = providers.len(), "provider registry ready");

    // ── Skills ───────────────────────────────────────────────────────
    let skills = Arc::new(
        SkillIndex::load(&config.skills.path).context("loading skill index")?,
    );
    let skill_watcher = if config.skills.path.is_dir() {
        Some(
            SkillWatcher::spawn(&config.skills.path, skills.clone())
                .context("starting skill watcher")?,
        )
    } else {
        tracing::warn!(
            path = %config.skills.path.display(),
            "skills directory missing, index empty and unwatched"
        );
        None
    };

    // ── Tool & capability registries ─────────────────────────────────
    let capabilities = Arc::new(
        builtin::build_capability_registry().context("building capability registry")?,
    );
    let active_tool = Arc::new(ActiveTool::new(skills.clone(), capabilities.clone()));
    let tools = Arc::new(
        builtin::build_tool_registry(active_tool).context("building tool registry")?,
    );
    tracing::info!(
        tools = tools.names().len(),
        capabilities = capabilities.names().len(),
        "tool registries ready"
    );

    // ── Agents ───────────────────────────────────────────────────────
    let definitions = troupe_agents::loader::load_definitions(&config.agents.path)
        .with_context(|| format!("reading agents directory {}", config.agents.path.display()))?;

    let pool = Arc::new(AgentPool::new());
    let binder: AgentBinder = {
        let providers = providers.clone();
        Arc::new(move |def| {
            let provider = providers.get(&def.model.provider)?;
            Ok(Agent::new(def.clone(), provider))
        })
    };
    for def in &definitions {
        match binder(def) {
            Ok(agent) => pool.insert(agent),
            Err(e) => {
                tracing::warn!(agent = %def.name, error = %e, "skipping unbindable agent");
            }
        }
    }
    if !pool.contains(&config.agents.coordinator) {
        anyhow::bail!(
            "coordinator agent '{}' not found in {}",
            config.agents.coordinator,
            config.agents.path.display()
        );
    }
    tracing::info!(agents = pool.len(), "agent pool ready");

    let agent_watcher = Some(
        AgentWatcher::spawn(&config.agents.path, pool.clone(), binder)
            .context("starting agent watcher")?,
    );

    // ── Session store ────────────────────────────────────────────────
    let store = Arc::new(SessionStore::open(&config.store.root).context("opening session store")?);

    // ── Orchestrator ─────────────────────────────────────────────────
    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        tools.clone(),
        skills.clone(),
        config.agents.coordinator.clone(),
    ));

    // ── Channel token (read once, hashed for constant-time compare) ──
    let channel_token_hash = match std::env::var(&config.server.channel_token_env) {
        Ok(token) if !token.is_empty() => {
            tracing::info!(env_var = %config.server.channel_token_env, "channel token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!(
                env_var = %config.server.channel_token_env,
                "channel token auth DISABLED — set the env var to enable"
            );
            None
        }
    };

    Ok(Runtime {
        state: AppState {
            config,
            providers,
            orchestrator,
            pool,
            tools,
            skills,
            store,
            active_runs: Arc::new(parking_lot::Mutex::new(std::collections::HashSet::new())),
            channel_token_hash,
        },
        _skill_watcher: skill_watcher,
        _agent_watcher: agent_watcher,
    })
}
