//! Agent-to-agent messaging and team mutation.
//!
//! `collaborate` and `assemble_team` are registered tools, but their effect
//! is a mutation of run state, so dispatch intercepts them by name and the
//! handlers here are the single code path for both.

use serde_json::Value;

use troupe_domain::message::{Message, ToolCall, ToolResult};

use super::{Orchestrator, RunContext, RunState};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// collaborate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handle a `collaborate` call from `from`.
///
/// Formats a human-readable line and emits it as a system-role message to
/// the client — out-of-band, never added to the LLM transcript. `direct`
/// and `help` queue `from` under the addressed agent so the moderator
/// prioritizes them next turn.
pub async fn handle_collaboration(
    ctx: &RunContext,
    state: &mut RunState,
    from: &str,
    call: &ToolCall,
) -> ToolResult {
    let action = call
        .arguments
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or("");
    let message = call
        .arguments
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("");
    let to_agent = call
        .arguments
        .get("to_agent")
        .and_then(Value::as_str)
        .unwrap_or("");

    let (line, recipients): (String, Vec<String>) = match action {
        "broadcast" | "complete" => {
            let recipients: Vec<String> = state
                .team
                .iter()
                .filter(|m| m.as_str() != from)
                .cloned()
                .collect();
            (format!("[{from} → TEAM]: {message}"), recipients)
        }
        "direct" | "help" => {
            if to_agent.is_empty() {
                return ToolResult::err(&call.id, format!("{action} requires 'to_agent'"));
            }
            if !state.team.iter().any(|m| m == to_agent) {
                return ToolResult::err(
                    &call.id,
                    format!("'{to_agent}' is not on the team"),
                );
            }
            state
                .pending_collaborations
                .entry(to_agent.to_string())
                .or_default()
                .push(from.to_string());
            (
                format!("[{from} → {to_agent}]: {message}"),
                vec![to_agent.to_string()],
            )
        }
        other => {
            return ToolResult::err(
                &call.id,
                format!("unknown collaborate action '{other}'"),
            );
        }
    };

    let mut system_msg = Message::system(line);
    system_msg
        .metadata
        .insert("collaboration".into(), serde_json::json!(action));
    ctx.emit_message(system_msg).await;

    ToolResult::ok(
        &call.id,
        serde_json::json!({
            "delivered": true,
            "recipients": recipients,
        }),
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// assemble_team (mid-run)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handle an in-run `assemble_team` call: replace the active team.
///
/// Unknown agent names fail with a structured `success: false` result
/// carrying the available agents and a suggestion; the team is unchanged.
pub fn handle_assemble_team(
    orch: &Orchestrator,
    state: &mut RunState,
    call: &ToolCall,
) -> ToolResult {
    let requested: Vec<String> = call
        .arguments
        .get("agents")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let available = orch.pool.names();
    let unknown: Vec<&String> = requested
        .iter()
        .filter(|name| !available.iter().any(|a| a == *name))
        .collect();

    if !unknown.is_empty() {
        let mut message = format!(
            "Unknown agent(s): {}. Available agents: {}.",
            unknown
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            available.join(", "),
        );
        if let Some(suggestion) = unknown.iter().find_map(|name| suggest(name, &available)) {
            message.push_str(&format!(" Did you mean '{suggestion}'?"));
        }
        return ToolResult::ok(
            &call.id,
            serde_json::json!({
                "success": false,
                "message": message,
            }),
        );
    }

    let mut team = vec![orch.coordinator_name.clone()];
    for name in requested {
        if !team.contains(&name) {
            team.push(name);
        }
    }
    state.team = team.clone();

    ToolResult::ok(
        &call.id,
        serde_json::json!({
            "success": true,
            "team": team,
        }),
    )
}

/// Fixed alias table plus a substring fallback.
fn suggest(name: &str, available: &[String]) -> Option<String> {
    const ALIASES: &[(&str, &str)] = &[
        ("documentation", "writer"),
        ("docs", "writer"),
        ("dev", "developer"),
        ("coder", "developer"),
        ("engineer", "developer"),
        ("qa", "tester"),
        ("reviewer", "critic"),
    ];

    let lower = name.to_lowercase();
    for (alias, target) in ALIASES {
        if lower == *alias && available.iter().any(|a| a == target) {
            return Some(target.to_string());
        }
    }

    // Fallback: the requested name contains, or is contained in, an
    // available agent's name.
    available
        .iter()
        .find(|a| a.contains(&lower) || lower.contains(a.as_str()))
        .cloned()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_table_wins() {
        let available = vec!["coordinator".to_string(), "writer".to_string()];
        assert_eq!(suggest("documentation", &available), Some("writer".into()));
        assert_eq!(suggest("docs", &available), Some("writer".into()));
    }

    #[test]
    fn alias_ignored_when_target_absent() {
        let available = vec!["coordinator".to_string()];
        // "documentation" → "writer", but no writer exists; substring
        // fallback finds nothing either.
        assert_eq!(suggest("documentation", &available), None);
    }

    #[test]
    fn substring_fallback_both_directions() {
        let available = vec!["developer".to_string()];
        assert_eq!(suggest("develop", &available), Some("developer".into()));
        assert_eq!(suggest("developer-agent", &available), Some("developer".into()));
    }
}
