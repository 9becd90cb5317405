//! Agent introspection endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::api_error;
use crate::state::AppState;

/// GET /api/agents → name-sorted summaries.
pub async fn list_agents(State(state): State<AppState>) -> Response {
    let agents: Vec<serde_json::Value> = state
        .pool
        .list()
        .iter()
        .map(|agent| {
            let def = &agent.definition;
            serde_json::json!({
                "name": def.name,
                "display_name": def.display_name,
                "description": def.description,
                "capabilities": def.capabilities,
            })
        })
        .collect();
    Json(serde_json::json!({ "agents": agents })).into_response()
}

/// GET /api/agents/{name} → the summary fields plus system_prompt, model,
/// and tool filter.
pub async fn get_agent(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let agent = match state.pool.get(&name) {
        Some(a) => a,
        None => return api_error(StatusCode::NOT_FOUND, "agent not found"),
    };
    let def = &agent.definition;
    Json(serde_json::json!({
        "name": def.name,
        "display_name": def.display_name,
        "description": def.description,
        "capabilities": def.capabilities,
        "skills": def.skills,
        "system_prompt": def.system_prompt,
        "model": def.model,
        "tools": def.tools,
    }))
    .into_response()
}
