//! Debounced filesystem watcher for the agents directory.
//!
//! Create/write events reload the touched definition file; remove events
//! unload the agent it defined. Events are debounced for 100 ms so editor
//! write sequences (write temp, rename, chmod) collapse into one reload.
//! Temp files never trigger anything.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use troupe_domain::agentdef::AgentDefinition;
use troupe_domain::Result;

use crate::agent::Agent;
use crate::loader;
use crate::pool::AgentPool;

/// Debounce window applied to filesystem events.
pub const AGENT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Binds a parsed definition to a provider, producing a pool-ready agent.
pub type AgentBinder = Arc<dyn Fn(&AgentDefinition) -> Result<Agent> + Send + Sync>;

enum FsChange {
    Upsert(PathBuf),
    Remove(PathBuf),
}

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct AgentWatcher {
    _watcher: RecommendedWatcher,
}

impl AgentWatcher {
    /// Watch `dir`, applying debounced changes to `pool` via `binder`.
    pub fn spawn(dir: &Path, pool: Arc<AgentPool>, binder: AgentBinder) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<FsChange>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "agent watcher event error");
                    return;
                }
            };
            for path in event.paths {
                if !loader::is_definition_file(&path) {
                    continue;
                }
                let change = match event.kind {
                    notify::EventKind::Remove(_) => FsChange::Remove(path),
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_) => {
                        FsChange::Upsert(path)
                    }
                    _ => continue,
                };
                let _ = tx.send(change);
            }
        })
        .map_err(|e| troupe_domain::Error::Other(format!("agent watcher: {e}")))?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| troupe_domain::Error::Other(format!("agent watcher: {e}")))?;

        let dir_display = dir.display().to_string();
        std::thread::Builder::new()
            .name("agent-watcher".into())
            .spawn(move || run_loop(rx, pool, binder))
            .map_err(|e| troupe_domain::Error::Other(format!("agent watcher thread: {e}")))?;

        tracing::info!(dir = %dir_display, "agent watcher started");
        Ok(Self { _watcher: watcher })
    }
}

fn run_loop(rx: mpsc::Receiver<FsChange>, pool: Arc<AgentPool>, binder: AgentBinder) {
    // Files that were removed before we ever parsed them fall back to the
    // file stem; otherwise unload by the name the file last declared.
    let mut names_by_path: HashMap<PathBuf, String> = HashMap::new();

    while let Ok(first) = rx.recv() {
        // Debounce: coalesce the burst per path, removes win.
        let mut batch: HashMap<PathBuf, bool> = HashMap::new();
        let mut record = |change: FsChange, batch: &mut HashMap<PathBuf, bool>| match change {
            FsChange::Upsert(p) => {
                batch.entry(p).or_insert(false);
            }
            FsChange::Remove(p) => {
                batch.insert(p, true);
            }
        };
        record(first, &mut batch);
        while let Ok(change) = rx.recv_timeout(AGENT_DEBOUNCE) {
            record(change, &mut batch);
        }

        for (path, removed) in batch {
            if removed {
                let name = names_by_path.remove(&path).unwrap_or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default()
                });
                if pool.remove(&name) {
                    tracing::info!(agent = %name, "agent unloaded");
                }
                continue;
            }

            match loader::load_definition(&path) {
                Ok(def) => {
                    let name = def.name.clone();
                    match binder(&def) {
                        Ok(agent) => {
                            names_by_path.insert(path, name.clone());
                            pool.insert(agent);
                            tracing::info!(agent = %name, "agent reloaded");
                        }
                        Err(e) => {
                            tracing::warn!(
                                agent = %name,
                                error = %e,
                                "agent definition could not be bound to a provider"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %e,
                        "ignoring invalid agent definition change"
                    );
                }
            }
        }
    }
}
