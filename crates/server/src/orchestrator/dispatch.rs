//! Tool dispatch — routes each call to an in-process tool or out to the
//! workspace, and owns the single sanitation point for bad tool calls.

use serde_json::Value;

use troupe_agents::Agent;
use troupe_domain::message::{Message, ToolCall, ToolResult};
use troupe_domain::{Error, Result};
use troupe_protocol::ServerFrame;
use troupe_tools::{ExecutionLocation, ToolContext};

use super::{collaborate, Orchestrator, RunContext, RunState};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sanitation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drop tool calls whose arguments are not a well-formed JSON object.
///
/// This is the one place empty- and malformed-argument suppression
/// happens, for every provider uniformly: dropped calls never reach
/// dispatch, never appear in the assistant message echoed back to the
/// provider, and any workspace reply for them dies in the pending map as
/// an unknown id.
pub fn sanitize_tool_calls(message: &mut Message) -> Vec<String> {
    let mut dropped = Vec::new();
    message.tool_calls.retain(|tc| {
        if tc.has_valid_arguments() {
            true
        } else {
            tracing::warn!(
                call_id = %tc.id,
                tool = %tc.tool_name,
                "dropping tool call without valid JSON-object arguments"
            );
            dropped.push(tc.id.clone());
            false
        }
    });
    dropped
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Execute the calls of one turn, in emission order. Tool errors become
/// error results; they never abort the turn or the run.
pub async fn dispatch_tool_calls(
    orch: &Orchestrator,
    ctx: &RunContext,
    state: &mut RunState,
    agent: &Agent,
    calls: &[ToolCall],
) -> Result<Vec<ToolResult>> {
    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let result = dispatch_one(orch, ctx, state, agent, call).await;
        results.push(result);
    }
    Ok(results)
}

async fn dispatch_one(
    orch: &Orchestrator,
    ctx: &RunContext,
    state: &mut RunState,
    agent: &Agent,
    call: &ToolCall,
) -> ToolResult {
    // A call outside the agent's allowed list is never dispatched — the
    // provider should not have seen the tool in the first place.
    if !agent.allows(&call.tool_name) {
        tracing::warn!(
            agent = %agent.name(),
            tool = %call.tool_name,
            "agent called a tool outside its allowed list"
        );
        return ToolResult::err(
            &call.id,
            format!("tool '{}' is not permitted for this agent", call.tool_name),
        );
    }

    // Not in the registry → client-side tool convention.
    let tool = match orch.tools.get(&call.tool_name) {
        Some(t) => t,
        None => return invoke_workspace_tool(orch, ctx, call).await,
    };

    // Orchestrator-state tools are intercepted by name; both effects live
    // in the collaborate module.
    match call.tool_name.as_str() {
        "collaborate" => {
            return collaborate::handle_collaboration(ctx, state, agent.name(), call).await
        }
        "assemble_team" => return collaborate::handle_assemble_team(orch, state, call),
        _ => {}
    }

    match tool.execution_location() {
        ExecutionLocation::Server => {
            // server_tool_start
            ctx.emit(ServerFrame::ToolCall {
                call: call.clone(),
                server_side: true,
            })
            .await;

            let tool_ctx = ToolContext {
                session_id: ctx.session_id.clone(),
                agent: agent.name().to_string(),
            };
            let result = match tool.execute(&tool_ctx, call.arguments.clone()).await {
                Ok(value) => ToolResult::ok(&call.id, value),
                Err(e) => ToolResult::err(&call.id, e.to_string()),
            };

            // server_tool_end, carrying the result.
            ctx.emit(ServerFrame::ToolResult {
                result: result.clone(),
            })
            .await;
            result
        }
        ExecutionLocation::Workspace => invoke_workspace_tool(orch, ctx, call).await,
    }
}

/// Send a `tool_call` frame to the workspace and wait for the correlated
/// reply. Three terminal conditions: reply delivered, session cancelled,
/// timeout (the pending entry is removed so a late reply is dropped).
pub async fn invoke_workspace_tool(
    orch: &Orchestrator,
    ctx: &RunContext,
    call: &ToolCall,
) -> ToolResult {
    let rx = ctx.pending.register(&call.id);

    ctx.emit(ServerFrame::ToolCall {
        call: call.clone(),
        server_side: false,
    })
    .await;

    tokio::select! {
        reply = rx => match reply {
            Ok(result) => result,
            Err(_) => {
                // Sender dropped without a reply: the channel cleaned up.
                ToolResult::err(&call.id, "workspace disconnected")
            }
        },
        _ = ctx.cancel.cancelled() => {
            ctx.pending.remove(&call.id);
            ToolResult::err(&call.id, "session cancelled")
        }
        _ = tokio::time::sleep(orch.workspace_timeout) => {
            ctx.pending.remove(&call.id);
            ToolResult::err(&call.id, "tool execution timeout")
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
