//! Per-turn agent selection and the global stop conditions.

use troupe_agents::Agent;
use troupe_domain::message::{Message, Role};
use troupe_domain::Result;
use troupe_providers::CompletionRequest;

use super::{Orchestrator, RunContext, RunState, SESSION_MESSAGE_CAP};

/// How many trailing messages are scanned for a completion signal.
const COMPLETION_WINDOW: usize = 5;

/// How many trailing assistant messages the coordinator sees when asked to
/// pick the next speaker.
const SELECTION_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Agent(String),
    Complete,
}

/// True while the run may keep taking turns: the transcript is under the
/// message cap and no completion signal has appeared.
pub fn should_continue(transcript: &[Message]) -> bool {
    transcript.len() < SESSION_MESSAGE_CAP && !completion_signal(transcript)
}

/// A completion signal in the trailing window: a `collaborate` call with
/// `action: complete`, or a completion phrase in message content.
pub fn completion_signal(transcript: &[Message]) -> bool {
    transcript
        .iter()
        .rev()
        .take(COMPLETION_WINDOW)
        .any(Message::is_completion_signal)
}

/// Select the next speaker. Rules, in priority order:
///
/// 1. empty transcript → coordinator
/// 2. completion signal in the last 5 messages → complete
/// 3. a team member has been addressed (`direct`/`help`) and has not yet
///    replied → that member, draining the pending entry
/// 4. ask the coordinator to pick; a reply that is not a team member falls
///    back to the coordinator
pub async fn select_next(
    orch: &Orchestrator,
    coordinator: &Agent,
    state: &mut RunState,
    ctx: &RunContext,
) -> Result<Selection> {
    // 1. Empty transcript: the coordinator opens.
    if state.transcript.is_empty() {
        return Ok(Selection::Agent(orch.coordinator_name.clone()));
    }

    // 2. Completion signal.
    if completion_signal(&state.transcript) {
        return Ok(Selection::Complete);
    }

    // 3. Pending collaborations, in team order.
    for member in &state.team {
        let has_pending = state
            .pending_collaborations
            .get(member)
            .map_or(false, |requesters| !requesters.is_empty());
        if has_pending {
            // Selecting the member is their chance to reply; drain it.
            state.pending_collaborations.remove(member);
            return Ok(Selection::Agent(member.clone()));
        }
    }

    // 4. Ask the coordinator.
    let reply = ask_coordinator(orch, coordinator, state, ctx).await?;
    let choice = reply.trim().trim_matches(['"', '\'', '.', '`']).to_lowercase();

    if choice == "complete" {
        return Ok(Selection::Complete);
    }
    if state.team.iter().any(|m| m == &choice) {
        return Ok(Selection::Agent(choice));
    }
    tracing::debug!(reply = %reply, "moderator reply is not a team member");
    Ok(Selection::Agent(orch.coordinator_name.clone()))
}

async fn ask_coordinator(
    orch: &Orchestrator,
    coordinator: &Agent,
    state: &RunState,
    ctx: &RunContext,
) -> Result<String> {
    let mut turn_counts: Vec<(String, usize)> = state
        .team
        .iter()
        .map(|member| {
            let count = state
                .transcript
                .iter()
                .filter(|m| m.role == Role::Assistant && m.agent == *member)
                .count();
            (member.clone(), count)
        })
        .collect();
    turn_counts.sort_by(|a, b| a.0.cmp(&b.0));

    let counts = turn_counts
        .iter()
        .map(|(name, count)| format!("- {name}: {count} turn(s)"))
        .collect::<Vec<_>>()
        .join("\n");

    let recent = state
        .transcript
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .rev()
        .take(SELECTION_WINDOW)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|m| format!("{}: {}", m.agent, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Task: {task}\n\nTeam turn counts so far:\n{counts}\n\n\
         Recent contributions:\n{recent}\n\n\
         Reply with exactly one team member's name to speak next, \
         or the single word complete if the task is finished.",
        task = ctx.task,
    );

    let req = CompletionRequest {
        messages: vec![
            Message::system(&coordinator.definition.system_prompt),
            Message::user(prompt),
        ],
        ..Default::default()
    };

    let completion = coordinator.complete(req).await?;
    Ok(completion.content)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
