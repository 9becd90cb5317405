//! Pending workspace tool calls, correlated by call id.
//!
//! Lives only for the duration of a single run. Writers are "register on
//! dispatch" and "remove on reply/timeout/cancel"; everything else reads.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use troupe_domain::message::ToolResult;

#[derive(Default)]
pub struct PendingMap {
    pending: Mutex<HashMap<String, oneshot::Sender<ToolResult>>>,
}

impl PendingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot reply slot for a dispatched call.
    pub fn register(&self, call_id: &str) -> oneshot::Receiver<ToolResult> {
        let (tx, rx) = oneshot::channel();
        let prev = self.pending.lock().insert(call_id.to_string(), tx);
        // Call ids are unique within a session; a collision means the
        // orchestrator double-dispatched.
        debug_assert!(prev.is_none(), "call_id collision: {call_id}");
        rx
    }

    /// Route an inbound `tool_result` to its waiter. A result for an
    /// unknown id is logged and dropped.
    pub fn complete(&self, result: ToolResult) -> bool {
        let entry = self.pending.lock().remove(&result.call_id);
        match entry {
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => {
                tracing::warn!(
                    call_id = %result.call_id,
                    "dropping tool_result for unknown call"
                );
                false
            }
        }
    }

    /// Remove a pending entry without delivering (timeout path). Returns
    /// whether the entry existed.
    pub fn remove(&self, call_id: &str) -> bool {
        self.pending.lock().remove(call_id).is_some()
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.pending.lock().contains_key(call_id)
    }

    /// Fail every pending call with the given reason (client gone, run
    /// cancelled). Returns the number of calls failed.
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<(String, oneshot::Sender<ToolResult>)> =
            self.pending.lock().drain().collect();
        let count = drained.len();
        for (call_id, tx) in drained {
            let _ = tx.send(ToolResult::err(call_id, reason));
        }
        if count > 0 {
            tracing::warn!(failed = count, reason = %reason, "failed in-flight workspace calls");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
