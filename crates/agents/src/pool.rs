//! The shared agent pool.
//!
//! Read-write locked: turn dispatch takes the read lock, reloads from the
//! watcher take the write lock. Inserts replace whole entries, so two
//! concurrent reloads of the same name leave the pool holding one of the
//! two well-formed agents, never a blend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::agent::Agent;

#[derive(Default)]
pub struct AgentPool {
    agents: RwLock<HashMap<String, Arc<Agent>>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an agent under its definition name.
    pub fn insert(&self, agent: Agent) {
        let name = agent.name().to_string();
        self.agents.write().insert(name, Arc::new(agent));
    }

    /// Remove an agent by name. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.agents.write().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.read().contains_key(name)
    }

    /// Sorted agent names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// All agents, name-sorted.
    pub fn list(&self) -> Vec<Arc<Agent>> {
        let agents = self.agents.read();
        let mut list: Vec<Arc<Agent>> = agents.values().cloned().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        list
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
