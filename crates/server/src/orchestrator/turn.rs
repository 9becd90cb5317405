//! One agent turn: stream the response, assemble the assistant message,
//! dispatch tools, extend the transcript.

use futures_util::StreamExt;

use troupe_agents::Agent;
use troupe_domain::agentdef::AgentDefinition;
use troupe_domain::message::{Message, ToolCall, Usage};
use troupe_domain::stream::StreamEvent;
use troupe_domain::{Error, Result};
use troupe_providers::CompletionRequest;
use troupe_skills::SkillIndex;

use super::{dispatch, Orchestrator, RunContext, RunState};

/// The agent's system prompt, extended with the skills its definition
/// declares (those still present in the index). The agent loads them on
/// demand through the active_tool.
pub(crate) fn system_prompt_for(skills: &SkillIndex, def: &AgentDefinition) -> String {
    let mut lines: Vec<String> = Vec::new();
    for name in &def.skills {
        match skills.get(name) {
            Some(hit) => lines.push(format!("- {}: {}", hit.name, hit.description)),
            None => tracing::debug!(agent = %def.name, skill = %name, "declared skill not indexed"),
        }
    }
    if lines.is_empty() {
        return def.system_prompt.clone();
    }
    format!(
        "{}\n\nSkills available to you (load with active_tool's load_skill):\n{}",
        def.system_prompt,
        lines.join("\n")
    )
}

/// Execute one turn for `agent`.
///
/// Emits exactly one assistant message, followed by at most one tool
/// message. A stream `Error` event aborts the run; tool errors do not.
pub async fn execute_turn(
    orch: &Orchestrator,
    ctx: &RunContext,
    state: &mut RunState,
    agent: &Agent,
) -> Result<()> {
    let mut messages = vec![Message::system(system_prompt_for(
        &orch.skills,
        &agent.definition,
    ))];
    messages.extend(state.transcript.iter().cloned());

    let req = CompletionRequest {
        messages,
        tools: orch.tools.get_allowed(&agent.definition.tools),
        ..Default::default()
    };

    let mut stream = agent.stream(req).await?;

    // ── Drain the event stream into one assistant message ───────────
    let mut content = String::new();
    let mut tool_calls: Vec<ToolCall> = Vec::new();
    let mut usage: Option<Usage> = None;

    loop {
        let event = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(Error::Cancelled),
            event = stream.next() => event,
        };
        match event {
            Some(StreamEvent::Content { text }) => content.push_str(&text),
            Some(StreamEvent::ToolCall { call }) => tool_calls.push(call),
            Some(StreamEvent::Done { usage: u }) => {
                usage = u;
                break;
            }
            Some(StreamEvent::Error { message }) => {
                return Err(Error::Provider {
                    provider: agent.provider_name().to_string(),
                    message,
                });
            }
            None => break,
        }
    }

    let mut assistant = Message::assistant(agent.name(), content);
    assistant.tool_calls = tool_calls;
    assistant.usage = usage;

    // Single sanitation point: bad calls vanish before the message enters
    // the transcript, so the provider never sees them echoed back.
    dispatch::sanitize_tool_calls(&mut assistant);

    let calls = assistant.tool_calls.clone();
    state.transcript.push(assistant.clone());
    ctx.emit_message(assistant).await;

    // ── Dispatch tool calls, in emission order ──────────────────────
    if !calls.is_empty() {
        let results = dispatch::dispatch_tool_calls(orch, ctx, state, agent, &calls).await?;
        if !results.is_empty() {
            state.transcript.push(Message::tool_results(results));
        }
    }

    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
