//! The channel client: session creation over HTTP, then the per-session
//! WebSocket loop that drives a run and answers workspace tool calls.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use troupe_domain::{Error, Result};
use troupe_protocol::{ClientFrame, ServerFrame};

use crate::backoff::ReconnectBackoff;
use crate::executor::WorkspaceExecutor;

/// The synthesis a completed run hands back.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: String,
    pub artifacts: Vec<String>,
    pub message_count: usize,
}

pub struct WorkspaceClient {
    /// Server base URL, e.g. `http://127.0.0.1:7700`.
    base_url: String,
    token: Option<String>,
    executor: Arc<WorkspaceExecutor>,
    backoff: ReconnectBackoff,
    http: reqwest::Client,
}

impl WorkspaceClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        executor: Arc<WorkspaceExecutor>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            executor,
            backoff: ReconnectBackoff::default(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    // ── HTTP control plane ─────────────────────────────────────────

    /// Create a session for this workspace's project root.
    pub async fn create_session(&self) -> Result<String> {
        let url = format!("{}/api/sessions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "project_path": self.executor.root().display().to_string(),
            }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("session creation failed");
            return Err(Error::Http(format!("HTTP {status}: {message}")));
        }
        body.get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| Error::Http("session response missing id".into()))
    }

    // ── Session channel ────────────────────────────────────────────

    fn ws_url(&self, session_id: &str) -> String {
        let ws_base = self
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        match &self.token {
            Some(token) => format!("{ws_base}/api/sessions/{session_id}/ws?token={token}"),
            None => format!("{ws_base}/api/sessions/{session_id}/ws"),
        }
    }

    /// Summarize the project for the `start` frame.
    fn project_info(&self) -> serde_json::Value {
        let root = self.executor.root();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let top_level: Vec<String> = std::fs::read_dir(root)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|e| e.file_name().to_str().map(String::from))
                    .filter(|n| !n.starts_with('.'))
                    .take(50)
                    .collect()
            })
            .unwrap_or_default();
        serde_json::json!({
            "name": name,
            "path": root.display().to_string(),
            "top_level": top_level,
        })
    }

    /// Run one task over the session channel, executing workspace tool
    /// calls as they arrive and printing progress. Returns the synthesis.
    ///
    /// Connection attempts retry with backoff; once a run has started, a
    /// dropped transport ends it.
    pub async fn run_task(
        &self,
        session_id: &str,
        task: &str,
        shutdown: CancellationToken,
    ) -> Result<RunOutcome> {
        let url = self.ws_url(session_id);

        let mut attempt: u32 = 0;
        let (ws, _) = loop {
            match tokio_tungstenite::connect_async(&url).await {
                Ok(conn) => break conn,
                Err(e) => {
                    if self.backoff.should_give_up(attempt) {
                        return Err(Error::Http(format!(
                            "connecting to {url} failed after {attempt} retries: {e}"
                        )));
                    }
                    let delay = self.backoff.delay_for_attempt(attempt);
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "connect failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => return Err(Error::Cancelled),
                    }
                    attempt += 1;
                }
            }
        };

        let (mut sink, mut stream) = ws.split();

        let start = ClientFrame::Start {
            task: task.to_string(),
            project_info: self.project_info(),
        };
        send_frame(&mut sink, &start).await?;

        // Tool executions run concurrently; their results funnel back
        // through this channel so the sink has a single writer loop.
        let (result_tx, mut result_rx) = tokio::sync::mpsc::channel::<ClientFrame>(16);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = send_frame(&mut sink, &ClientFrame::Cancel {}).await;
                    return Err(Error::Cancelled);
                }
                Some(frame) = result_rx.recv() => {
                    send_frame(&mut sink, &frame).await?;
                }
                msg = stream.next() => {
                    let msg = match msg {
                        Some(Ok(m)) => m,
                        Some(Err(e)) => return Err(Error::Http(format!("transport: {e}"))),
                        None => return Err(Error::Http("server closed the channel".into())),
                    };
                    let text = match msg {
                        WsMessage::Text(t) => t,
                        WsMessage::Close(_) => {
                            return Err(Error::Http("server closed the channel".into()))
                        }
                        _ => continue,
                    };
                    let frame = match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(f) => f,
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping malformed server frame");
                            continue;
                        }
                    };
                    if let Some(outcome) = self.handle_server_frame(frame, &result_tx).await? {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    /// Process one server frame. Returns `Some` when the run is over.
    async fn handle_server_frame(
        &self,
        frame: ServerFrame,
        result_tx: &tokio::sync::mpsc::Sender<ClientFrame>,
    ) -> Result<Option<RunOutcome>> {
        match frame {
            ServerFrame::AgentMessage { message } => {
                let who = if message.agent.is_empty() {
                    "system".to_string()
                } else {
                    message.agent.clone()
                };
                if !message.content.is_empty() {
                    println!("[{who}] {}", message.content);
                }
                Ok(None)
            }

            ServerFrame::ToolCall { call, server_side } => {
                if server_side {
                    println!("  • server tool {}", call.tool_name);
                    return Ok(None);
                }
                println!("  • running {}", call.tool_name);
                let executor = self.executor.clone();
                let tx = result_tx.clone();
                tokio::spawn(async move {
                    let result = executor.execute(&call).await;
                    let _ = tx.send(ClientFrame::ToolResult { result }).await;
                });
                Ok(None)
            }

            ServerFrame::ToolResult { result } => {
                if let Some(error) = &result.error {
                    println!("  ✗ {error}");
                }
                Ok(None)
            }

            ServerFrame::Complete {
                summary,
                artifacts,
                message_count,
            } => {
                println!("\n{summary}");
                if !artifacts.is_empty() {
                    println!("artifacts: {}", artifacts.join(", "));
                }
                Ok(Some(RunOutcome {
                    summary,
                    artifacts,
                    message_count,
                }))
            }

            ServerFrame::Error { message } => Err(Error::Other(message)),

            ServerFrame::Pong {} => Ok(None),
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> Result<()>
where
    S: SinkExt<WsMessage> + Unpin,
{
    let json = serde_json::to_string(frame)?;
    sink.send(WsMessage::Text(json))
        .await
        .map_err(|_| Error::Http("failed to send frame".into()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
