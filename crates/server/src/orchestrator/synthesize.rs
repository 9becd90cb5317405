//! Run synthesis — artifact extraction plus the final summary call.

use serde_json::Value;

use troupe_agents::Agent;
use troupe_domain::message::{Message, Role};
use troupe_providers::CompletionRequest;

use super::{Orchestrator, RunState};

/// Character budget for the assistant contributions quoted in the summary
/// prompt. Older contributions are elided with a marker, never silently.
const CONTRIBUTION_BUDGET: usize = 4000;

pub struct Synthesis {
    pub summary: String,
    pub artifacts: Vec<String>,
}

/// Gather artifacts and ask the coordinator for a concise 2–3 paragraph
/// summary. A failed summary call degrades to a plain fallback rather than
/// erroring a run whose work already happened.
pub async fn synthesize(
    orch: &Orchestrator,
    coordinator: &Agent,
    state: &RunState,
) -> Synthesis {
    let artifacts = extract_artifacts(&state.transcript);

    let assistant_count = state
        .transcript
        .iter()
        .filter(|m| m.role == Role::Assistant)
        .count();

    let contributions = collect_contributions(&state.transcript);
    let prompt = format!(
        "The team has finished working on this task:\n\n{task}\n\n\
         Contributions:\n{contributions}\n\n\
         Write a concise 2-3 paragraph summary of what was done and what \
         the developer should look at.",
        task = state
            .transcript
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or(""),
    );

    let req = CompletionRequest {
        messages: vec![
            Message::system(&coordinator.definition.system_prompt),
            Message::user(prompt),
        ],
        ..Default::default()
    };

    let summary = match coordinator.complete(req).await {
        Ok(completion) if !completion.content.is_empty() => completion.content,
        Ok(_) => fallback_summary(assistant_count, &artifacts),
        Err(e) => {
            tracing::warn!(error = %e, "summary call failed, using fallback");
            fallback_summary(assistant_count, &artifacts)
        }
    };

    Synthesis { summary, artifacts }
}

fn fallback_summary(assistant_count: usize, artifacts: &[String]) -> String {
    if artifacts.is_empty() {
        format!("The team finished after {assistant_count} contribution(s).")
    } else {
        format!(
            "The team finished after {assistant_count} contribution(s), producing: {}.",
            artifacts.join(", ")
        )
    }
}

/// Artifacts are the union of every `collaborate` call's `artifacts` list
/// and every `write_file` call's `path` argument, first-seen order.
pub fn extract_artifacts(transcript: &[Message]) -> Vec<String> {
    let mut artifacts: Vec<String> = Vec::new();
    let mut push = |artifact: &str| {
        if !artifact.is_empty() && !artifacts.iter().any(|a| a == artifact) {
            artifacts.push(artifact.to_string());
        }
    };

    for msg in transcript {
        for tc in &msg.tool_calls {
            match tc.tool_name.as_str() {
                "collaborate" => {
                    if let Some(list) = tc.arguments.get("artifacts").and_then(Value::as_array) {
                        for item in list.iter().filter_map(Value::as_str) {
                            push(item);
                        }
                    }
                }
                "write_file" => {
                    if let Some(path) = tc.arguments.get("path").and_then(Value::as_str) {
                        push(path);
                    }
                }
                _ => {}
            }
        }
    }
    artifacts
}

/// Quote assistant contributions, newest kept, trimmed to the character
/// budget with an explicit elision note.
fn collect_contributions(transcript: &[Message]) -> String {
    let lines: Vec<String> = transcript
        .iter()
        .filter(|m| m.role == Role::Assistant && !m.content.is_empty())
        .map(|m| format!("{}: {}", m.agent, m.content))
        .collect();

    let mut kept: Vec<&String> = Vec::new();
    let mut total = 0usize;
    for line in lines.iter().rev() {
        if total + line.len() > CONTRIBUTION_BUDGET {
            break;
        }
        total += line.len() + 1;
        kept.push(line);
    }
    kept.reverse();

    let elided = lines.len() - kept.len();
    let mut out = String::new();
    if elided > 0 {
        out.push_str(&format!("(… {elided} earlier message(s) elided)\n"));
    }
    out.push_str(
        &kept
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    );
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
