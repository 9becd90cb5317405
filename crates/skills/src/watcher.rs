//! Debounced filesystem watcher for the skills directory.
//!
//! Directory changes reload the whole index after a 500 ms quiet period, so
//! a burst of writes (editor save, git checkout) triggers one rescan.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use troupe_domain::Result;

use crate::index::SkillIndex;

/// Debounce window applied to filesystem events before a reload.
pub const SKILL_DEBOUNCE: Duration = Duration::from_millis(500);

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct SkillWatcher {
    _watcher: RecommendedWatcher,
}

impl SkillWatcher {
    /// Watch `root` and reload `index` after each debounced change burst.
    pub fn spawn(root: &Path, index: Arc<SkillIndex>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<()>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(_) => {
                    let _ = tx.send(());
                }
                Err(e) => tracing::warn!(error = %e, "skill watcher event error"),
            }
        })
        .map_err(|e| troupe_domain::Error::Other(format!("skill watcher: {e}")))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| troupe_domain::Error::Other(format!("skill watcher: {e}")))?;

        let root_display = root.display().to_string();
        std::thread::Builder::new()
            .name("skill-watcher".into())
            .spawn(move || {
                while rx.recv().is_ok() {
                    // Absorb the burst: keep draining until quiet.
                    while rx.recv_timeout(SKILL_DEBOUNCE).is_ok() {}
                    match index.reload() {
                        Ok(count) => {
                            tracing::info!(skills_count = count, "skills reloaded after change")
                        }
                        Err(e) => tracing::warn!(error = %e, "skill reload failed"),
                    }
                }
            })
            .map_err(|e| troupe_domain::Error::Other(format!("skill watcher thread: {e}")))?;

        tracing::info!(root = %root_display, "skill watcher started");
        Ok(Self { _watcher: watcher })
    }
}
