//! The session record — one per developer workspace session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use troupe_domain::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Paused,
    Completed,
    Error,
}

/// A single session tracked by the server.
///
/// `messages` is append-only: the orchestrator owns the in-memory
/// transcript of a run and writes it back here at run completion only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub project_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: SessionState,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub active_team: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl SessionRecord {
    pub fn new(project_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_path: project_path.into(),
            created_at: now,
            updated_at: now,
            state: SessionState::Active,
            messages: Vec::new(),
            active_team: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Append a run's transcript and move to a terminal or idle state.
    pub fn absorb_run(&mut self, messages: Vec<Message>, team: Vec<String>, state: SessionState) {
        self.messages.extend(messages);
        self.active_team = team;
        self.state = state;
        self.updated_at = Utc::now();
    }
}
