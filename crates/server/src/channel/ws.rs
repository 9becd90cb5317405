//! WebSocket endpoint for workspace session channels.
//!
//! Flow:
//! 1. Workspace connects to `/api/sessions/{id}/ws?token=<pre-shared>`
//! 2. One reader loop demultiplexes inbound frames; one writer task
//!    serializes all outbound frames through a single mpsc channel
//! 3. A `start` frame spawns the (at most one) orchestration task for the
//!    session; `tool_result` frames route through the pending map;
//!    `cancel` and transport loss cancel the run at its next suspension

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use troupe_domain::Error;
use troupe_protocol::{ClientFrame, ServerFrame};
use troupe_sessions::SessionState;

use crate::channel::PendingMap;
use crate::orchestrator::RunContext;
use crate::state::AppState;

/// Constant-time token comparison against the startup-computed hash.
fn token_matches(provided: &str, expected_hash: &[u8]) -> bool {
    let provided_hash = Sha256::digest(provided.as_bytes());
    provided_hash.as_slice().ct_eq(expected_hash).into()
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /api/sessions/{id}/ws — upgrade to the session channel.
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    if let Some(expected) = &state.channel_token_hash {
        let provided = query.token.as_deref().unwrap_or("");
        if !token_matches(provided, expected) {
            return (
                axum::http::StatusCode::UNAUTHORIZED,
                "invalid or missing channel token",
            )
                .into_response();
        }
    }

    if !state.store.contains(&session_id) {
        return (axum::http::StatusCode::NOT_FOUND, "unknown session").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Socket handler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (ws_sink, mut ws_stream) = socket.split();

    // All outbound frames are serialized through this one channel; the
    // writer task is the only place that touches the sink.
    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerFrame>(64);
    let writer = tokio::spawn(writer_task(ws_sink, outbound_rx));

    let pending = Arc::new(PendingMap::new());
    let mut run_cancel: Option<CancellationToken> = None;

    tracing::info!(session_id = %session_id, "workspace connected");

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            WsMessage::Text(text) => {
                let frame = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            "dropping malformed frame"
                        );
                        continue;
                    }
                };
                handle_frame(
                    &state,
                    &session_id,
                    frame,
                    &outbound_tx,
                    &pending,
                    &mut run_cancel,
                )
                .await;
            }
            WsMessage::Close(_) => break,
            // Transport-level ping/pong is handled by axum.
            _ => {}
        }
    }

    // Cleanup: cancel the run, fail in-flight calls, stop the writer.
    if let Some(cancel) = run_cancel {
        cancel.cancel();
    }
    pending.fail_all("workspace disconnected");
    drop(outbound_tx);
    writer.abort();
    tracing::info!(session_id = %session_id, "workspace disconnected");
}

async fn writer_task(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut outbound_rx: mpsc::Receiver<ServerFrame>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        let json = match serde_json::to_string(&frame) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound frame");
                continue;
            }
        };
        if sink.send(WsMessage::Text(json)).await.is_err() {
            break;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frame dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn handle_frame(
    state: &AppState,
    session_id: &str,
    frame: ClientFrame,
    outbound_tx: &mpsc::Sender<ServerFrame>,
    pending: &Arc<PendingMap>,
    run_cancel: &mut Option<CancellationToken>,
) {
    match frame {
        ClientFrame::Start { task, project_info } => {
            // Zero or one active orchestration task per session.
            let already_active = {
                let mut active = state.active_runs.lock();
                if active.contains(session_id) {
                    true
                } else {
                    active.insert(session_id.to_string());
                    false
                }
            };
            if already_active {
                let _ = outbound_tx
                    .send(ServerFrame::Error {
                        message: "a run is already active for this session".into(),
                    })
                    .await;
                return;
            }

            let cancel = CancellationToken::new();
            *run_cancel = Some(cancel.clone());

            tokio::spawn(run_session(
                state.clone(),
                session_id.to_string(),
                task,
                project_info,
                outbound_tx.clone(),
                pending.clone(),
                cancel,
            ));
        }

        ClientFrame::ToolResult { result } => {
            // Routed by call_id; unknown ids are logged and dropped
            // inside the pending map.
            pending.complete(result);
        }

        ClientFrame::Cancel {} => {
            if let Some(cancel) = run_cancel {
                tracing::info!(session_id = %session_id, "client requested cancel");
                cancel.cancel();
            }
        }

        ClientFrame::Ping {} => {
            let _ = outbound_tx.send(ServerFrame::Pong {}).await;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestration task
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[allow(clippy::too_many_arguments)]
async fn run_session(
    state: AppState,
    session_id: String,
    task: String,
    project_info: Value,
    outbound_tx: mpsc::Sender<ServerFrame>,
    pending: Arc<PendingMap>,
    cancel: CancellationToken,
) {
    let ctx = RunContext {
        session_id: session_id.clone(),
        task,
        outbound: outbound_tx.clone(),
        pending: pending.clone(),
        cancel,
    };

    // Spawn the engine in its own task so a panic is contained at this
    // boundary instead of taking down the process.
    let orchestrator = state.orchestrator.clone();
    let engine = tokio::spawn(async move { orchestrator.run(&ctx).await });

    let outcome = match engine.await {
        Ok(result) => result,
        Err(join_err) => {
            if join_err.is_panic() {
                tracing::error!(session_id = %session_id, "orchestration task panicked");
            }
            Err(Error::Other("internal orchestration failure".into()))
        }
    };

    match outcome {
        Ok(run) => {
            let message_count = run.messages.len();
            persist_run(
                &state,
                &session_id,
                &project_info,
                run.messages,
                run.team,
                SessionState::Completed,
            );
            let _ = outbound_tx
                .send(ServerFrame::Complete {
                    summary: run.summary,
                    artifacts: run.artifacts,
                    message_count,
                })
                .await;
        }
        Err(Error::Cancelled) => {
            tracing::info!(session_id = %session_id, "run cancelled");
            persist_run(
                &state,
                &session_id,
                &project_info,
                Vec::new(),
                Vec::new(),
                SessionState::Paused,
            );
            let _ = outbound_tx
                .send(ServerFrame::Error {
                    message: "run cancelled".into(),
                })
                .await;
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "run failed");
            persist_run(
                &state,
                &session_id,
                &project_info,
                Vec::new(),
                Vec::new(),
                SessionState::Error,
            );
            let _ = outbound_tx
                .send(ServerFrame::Error {
                    message: e.to_string(),
                })
                .await;
        }
    }

    pending.fail_all("run ended");
    state.active_runs.lock().remove(&session_id);
}

/// Write the run back to the session store. The store owns the on-disk
/// copy and is updated at run completion only.
fn persist_run(
    state: &AppState,
    session_id: &str,
    project_info: &Value,
    messages: Vec<troupe_domain::message::Message>,
    team: Vec<String>,
    session_state: SessionState,
) {
    let mut record = match state.store.get(session_id) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "session vanished before persist");
            return;
        }
    };
    if !project_info.is_null() {
        record
            .metadata
            .insert("project_info".into(), project_info.clone());
    }
    record.absorb_run(messages, team, session_state);
    if let Err(e) = state.store.save(&record) {
        tracing::error!(session_id = %session_id, error = %e, "failed to persist session");
    }
}
