//! Team assembly — invoked once per run.
//!
//! The coordinator is asked to pick a team with the `assemble_team` tool
//! attached; the team is read from the tool call's arguments. No call means
//! the coordinator works alone.

use serde_json::Value;

use troupe_agents::Agent;
use troupe_domain::message::Message;
use troupe_domain::Result;
use troupe_providers::CompletionRequest;

use super::Orchestrator;

/// Ask the coordinator to assemble a team for the task.
///
/// Unknown agent names in the reply are logged and skipped; the coordinator
/// is always implicitly on the team.
pub async fn assemble_team(
    orch: &Orchestrator,
    coordinator: &Agent,
    task: &str,
) -> Result<Vec<String>> {
    let roster = orch
        .pool
        .list()
        .into_iter()
        .filter(|a| a.name() != orch.coordinator_name)
        .map(|a| format!("- {}: {}", a.name(), a.definition.description))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "A developer submitted this task:\n\n{task}\n\n\
         Available specialist agents:\n{roster}\n\n\
         Call assemble_team with the agents best suited for this task. \
         Pick the smallest team that can finish it."
    );

    let assemble_def = orch
        .tools
        .get("assemble_team")
        .map(|t| t.definition())
        .into_iter()
        .collect();

    let req = CompletionRequest {
        messages: vec![
            Message::system(&coordinator.definition.system_prompt),
            Message::user(prompt),
        ],
        tools: assemble_def,
        ..Default::default()
    };

    let completion = coordinator.complete(req).await?;

    let mut team = vec![orch.coordinator_name.clone()];
    let call = completion
        .tool_calls
        .iter()
        .find(|tc| tc.tool_name == "assemble_team");

    match call {
        Some(tc) => {
            let requested = tc
                .arguments
                .get("agents")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for name in requested.iter().filter_map(Value::as_str) {
                if name == orch.coordinator_name || team.iter().any(|t| t == name) {
                    continue;
                }
                if orch.pool.contains(name) {
                    team.push(name.to_string());
                } else {
                    tracing::warn!(agent = %name, "coordinator picked an unknown agent, skipping");
                }
            }
        }
        None => {
            tracing::info!("coordinator emitted no assemble_team call, working alone");
        }
    }

    Ok(team)
}
