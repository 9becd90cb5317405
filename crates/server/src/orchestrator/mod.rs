//! The orchestration engine: three logical actors (coordinator, moderator,
//! synthesizer) over one shared transcript, plus the tool dispatcher.
//!
//! One [`Orchestrator`] is shared by all sessions; per-run state lives in
//! [`RunState`] and per-session plumbing in [`RunContext`]. Outbound events
//! are plain [`ServerFrame`]s pushed into the session's writer channel, so
//! frame ordering follows transcript ordering by construction.

pub mod collaborate;
pub mod coordinator;
pub mod dispatch;
pub mod moderator;
pub mod synthesize;
pub mod turn;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use troupe_agents::{Agent, AgentPool};
use troupe_domain::message::Message;
use troupe_domain::{Error, Result};
use troupe_protocol::ServerFrame;
use troupe_skills::SkillIndex;
use troupe_tools::ToolRegistry;

use crate::channel::PendingMap;

/// Hard per-run turn cap — the second safety net beyond the moderator's
/// message cap.
pub const MAX_RUN_TURNS: usize = 20;

/// The moderator stops a run once the transcript reaches this many messages.
pub const SESSION_MESSAGE_CAP: usize = 50;

/// How long a workspace tool call may run before it fails.
pub const WORKSPACE_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run plumbing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a run needs to talk to its session.
pub struct RunContext {
    pub session_id: String,
    pub task: String,
    /// Outbound frames, consumed by the session's writer task.
    pub outbound: mpsc::Sender<ServerFrame>,
    /// Correlation map for workspace tool calls.
    pub pending: Arc<PendingMap>,
    /// Cancelled when the client sends `cancel` or the transport drops.
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Push a frame to the session writer. Send failures mean the client is
    /// gone; the run notices via the cancel token, so they are ignored here.
    pub async fn emit(&self, frame: ServerFrame) {
        let _ = self.outbound.send(frame).await;
    }

    /// Emit a transcript or out-of-band message to the client.
    pub async fn emit_message(&self, message: Message) {
        self.emit(ServerFrame::AgentMessage { message }).await;
    }
}

/// Mutable state of one run.
pub struct RunState {
    /// The shared transcript, totally ordered.
    pub transcript: Vec<Message>,
    /// Agents eligible to take turns. The coordinator is always a member.
    pub team: Vec<String>,
    /// addressed agent → requesters awaiting a reply. Drained by the
    /// moderator, cleared when the run ends.
    pub pending_collaborations: HashMap<String, Vec<String>>,
}

impl RunState {
    fn new(task: &str, coordinator: &str) -> Self {
        Self {
            transcript: vec![Message::user(task)],
            team: vec![coordinator.to_string()],
            pending_collaborations: HashMap::new(),
        }
    }
}

/// What a finished run hands back to the session.
#[derive(Debug)]
pub struct RunResult {
    pub summary: String,
    pub artifacts: Vec<String>,
    pub messages: Vec<Message>,
    pub team: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Orchestrator {
    pub(crate) pool: Arc<AgentPool>,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) skills: Arc<SkillIndex>,
    pub(crate) coordinator_name: String,
    pub(crate) workspace_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        pool: Arc<AgentPool>,
        tools: Arc<ToolRegistry>,
        skills: Arc<SkillIndex>,
        coordinator_name: String,
    ) -> Self {
        Self {
            pool,
            tools,
            skills,
            coordinator_name,
            workspace_timeout: WORKSPACE_TOOL_TIMEOUT,
        }
    }

    /// Override the workspace tool timeout (tests use short timeouts).
    pub fn with_workspace_timeout(mut self, timeout: Duration) -> Self {
        self.workspace_timeout = timeout;
        self
    }

    pub(crate) fn coordinator(&self) -> Result<Arc<Agent>> {
        self.pool
            .get(&self.coordinator_name)
            .ok_or_else(|| Error::AgentNotFound(self.coordinator_name.clone()))
    }

    /// Drive one full run: assemble the team, loop turns under the
    /// moderator, then synthesize.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunResult> {
        let coordinator = self.coordinator()?;
        let mut state = RunState::new(&ctx.task, &self.coordinator_name);

        // ── Team assembly ────────────────────────────────────────────
        state.team = coordinator::assemble_team(self, &coordinator, &ctx.task).await?;
        tracing::info!(
            session_id = %ctx.session_id,
            team = ?state.team,
            "team assembled"
        );

        // ── Turn loop ────────────────────────────────────────────────
        let mut turns = 0;
        while turns < MAX_RUN_TURNS && moderator::should_continue(&state.transcript) {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let selection = moderator::select_next(self, &coordinator, &mut state, ctx).await?;
            let agent_name = match selection {
                moderator::Selection::Complete => break,
                moderator::Selection::Agent(name) => name,
            };

            let agent = match self.pool.get(&agent_name) {
                Some(a) => a,
                None => {
                    // The pool reloaded mid-run; fall back to the coordinator.
                    tracing::warn!(agent = %agent_name, "selected agent vanished from pool");
                    coordinator.clone()
                }
            };

            turn::execute_turn(self, ctx, &mut state, &agent).await?;
            turns += 1;
        }

        if turns == MAX_RUN_TURNS {
            tracing::warn!(session_id = %ctx.session_id, "run hit the turn cap");
        }

        // A stale `help` must not force-select an agent in the next run.
        state.pending_collaborations.clear();

        // ── Synthesis ────────────────────────────────────────────────
        let synthesis = synthesize::synthesize(self, &coordinator, &state).await;
        Ok(RunResult {
            summary: synthesis.summary,
            artifacts: synthesis.artifacts,
            messages: state.transcript,
            team: state.team,
        })
    }
}
