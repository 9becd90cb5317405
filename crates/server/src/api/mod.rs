//! HTTP control plane.
//!
//! Every response carries an `X-Request-ID`; error bodies are
//! `{ "error": <string> }`; panics in handlers surface as 500s via the
//! catch-panic layer, never a dead process.

pub mod agents;
pub mod health;
pub mod sessions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::channel::ws;
use crate::state::AppState;

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

/// Attach a generated request id to every response.
async fn request_id(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let id = uuid::Uuid::new_v4().to_string();
    let mut response = next.run(req).await;
    if let Ok(value) = id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Sessions
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions", get(sessions::list_sessions))
        .route("/api/sessions/:id", get(sessions::get_session))
        .route("/api/sessions/:id", delete(sessions::delete_session))
        .route("/api/sessions/:id/ws", get(ws::session_ws))
        // Agents
        .route("/api/agents", get(agents::list_agents))
        .route("/api/agents/:name", get(agents::get_agent))
        // Health
        .route("/api/health", get(health::health))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id))
        .with_state(state)
}
