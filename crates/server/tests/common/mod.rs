//! Helpers shared by the integration test binaries.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use troupe_agents::{Agent, AgentPool};
use troupe_domain::agentdef::{AgentDefinition, ModelConfig, ToolFilter};
use troupe_domain::config::Config;
use troupe_domain::message::ToolCall;
use troupe_domain::stream::{BoxStream, StreamEvent};
use troupe_domain::{Error, Result};
use troupe_providers::{Completion, CompletionRequest, LlmProvider, ProviderRegistry};
use troupe_server::api;
use troupe_server::orchestrator::Orchestrator;
use troupe_server::state::AppState;
use troupe_sessions::SessionStore;
use troupe_skills::SkillIndex;
use troupe_tools::{builtin, ActiveTool, CapabilityRegistry};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Deterministic provider: `complete` and `stream` pop pre-scripted
/// responses; an exhausted script is a test bug and errors loudly.
#[derive(Default)]
pub struct ScriptedProvider {
    completions: Mutex<VecDeque<Completion>>,
    streams: Mutex<VecDeque<Vec<StreamEvent>>>,
}

impl ScriptedProvider {
    pub fn push_completion(&self, content: &str, tool_calls: Vec<ToolCall>) {
        self.completions.lock().push_back(Completion {
            content: content.to_string(),
            tool_calls,
            usage: None,
        });
    }

    pub fn push_stream(&self, events: Vec<StreamEvent>) {
        self.streams.lock().push_back(events);
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }
    fn supports_tools(&self) -> bool {
        true
    }
    async fn complete(&self, _req: CompletionRequest) -> Result<Completion> {
        self.completions
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Other("completion script exhausted".into()))
    }
    async fn stream(&self, _req: CompletionRequest) -> Result<BoxStream<'static, StreamEvent>> {
        let events = self
            .streams
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Other("stream script exhausted".into()))?;
        Ok(Box::pin(futures_util::stream::iter(events)))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fixtures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn definition(name: &str, description: &str) -> AgentDefinition {
    AgentDefinition {
        name: name.into(),
        display_name: name.into(),
        description: description.into(),
        system_prompt: format!("You are the {name}."),
        capabilities: vec![],
        skills: vec![],
        model: ModelConfig {
            provider: "scripted".into(),
            model_name: "scripted-1".into(),
            temperature: 0.0,
            max_tokens: 1024,
        },
        tools: ToolFilter {
            allowed: vec![
                "active_tool".into(),
                "collaborate".into(),
                "assemble_team".into(),
                "read_file".into(),
                "write_file".into(),
            ],
            denied: vec![],
        },
    }
}

/// Assemble a full [`AppState`] around a scripted provider: a coordinator
/// plus the named agents, stock tool registries, and a session store under
/// `store_root`.
pub fn build_state(
    provider: Arc<ScriptedProvider>,
    agents: &[&str],
    store_root: &Path,
) -> AppState {
    let pool = Arc::new(AgentPool::new());
    pool.insert(Agent::new(
        definition("coordinator", "Plans work and coordinates the team"),
        provider.clone(),
    ));
    for name in agents {
        pool.insert(Agent::new(
            definition(name, &format!("The {name} specialist")),
            provider.clone(),
        ));
    }

    let skills = Arc::new(SkillIndex::empty());
    let active_tool = Arc::new(ActiveTool::new(
        skills.clone(),
        Arc::new(CapabilityRegistry::new()),
    ));
    let tools = Arc::new(builtin::build_tool_registry(active_tool).unwrap());

    let orchestrator = Arc::new(
        Orchestrator::new(pool.clone(), tools.clone(), skills.clone(), "coordinator".into())
            .with_workspace_timeout(Duration::from_secs(5)),
    );

    AppState {
        config: Arc::new(Config::default()),
        providers: Arc::new(ProviderRegistry::from_providers(vec![
            provider as Arc<dyn LlmProvider>,
        ])),
        orchestrator,
        pool,
        tools,
        skills,
        store: Arc::new(SessionStore::open(store_root).unwrap()),
        active_runs: Arc::new(Mutex::new(Default::default())),
        channel_token_hash: None,
    }
}

/// Serve the API router on an ephemeral port; returns the base URL.
pub async fn spawn_server(state: AppState) -> String {
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}
