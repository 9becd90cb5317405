//! Session management endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use troupe_domain::Error;
use troupe_sessions::{SessionRecord, SessionState};

use crate::api::api_error;
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub project_path: String,
}

#[derive(Serialize)]
struct SessionSummary {
    id: String,
    project_path: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    state: SessionState,
    active_team: Vec<String>,
    message_count: usize,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            project_path: record.project_path.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            state: record.state,
            active_team: record.active_team.clone(),
            message_count: record.messages.len(),
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub project_path: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// POST /api/sessions → 201 with the new record's summary fields.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    if req.project_path.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "project_path must not be empty");
    }

    let record = SessionRecord::new(&req.project_path);
    if let Err(e) = state.store.save(&record) {
        tracing::error!(error = %e, "failed to create session");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    tracing::info!(session_id = %record.id, project_path = %record.project_path, "session created");
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": record.id,
            "project_path": record.project_path,
            "created_at": record.created_at,
            "state": record.state,
        })),
    )
        .into_response()
}

/// GET /api/sessions?project_path= → `{ "sessions": [...] }`.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let records = state.store.list(query.project_path.as_deref());
    let sessions: Vec<SessionSummary> = records.iter().map(SessionSummary::from).collect();
    Json(serde_json::json!({ "sessions": sessions })).into_response()
}

/// GET /api/sessions/{id} → the full session record.
pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get(&id) {
        Ok(record) => Json(record).into_response(),
        Err(Error::SessionNotFound(_)) => api_error(StatusCode::NOT_FOUND, "session not found"),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// DELETE /api/sessions/{id} → 204.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(Error::SessionNotFound(_)) => api_error(StatusCode::NOT_FOUND, "session not found"),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
