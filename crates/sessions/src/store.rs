//! On-disk session store.
//!
//! One JSON file per session under `{root}/sessions/{id}.json`, written via
//! temp-file-plus-rename so a crash mid-write never leaves a torn record.
//! An in-memory cache fronts the directory; it is loaded once at startup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use troupe_domain::{Error, Result};

use crate::record::SessionRecord;

pub struct SessionStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    /// Open (or create) the store under `{root}/sessions/`.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join("sessions");
        std::fs::create_dir_all(&dir)?;

        let mut cache = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(Error::Io)
                .and_then(|raw| serde_json::from_str::<SessionRecord>(&raw).map_err(Error::Json))
            {
                Ok(record) => {
                    cache.insert(record.id.clone(), record);
                }
                Err(e) => {
                    tracing::warn!(
                        file = %path.display(),
                        error = %e,
                        "skipping unreadable session record"
                    );
                }
            }
        }

        tracing::info!(
            sessions = cache.len(),
            dir = %dir.display(),
            "session store loaded"
        );

        Ok(Self {
            dir,
            cache: RwLock::new(cache),
        })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist a record: write to a temp file in the same directory, then
    /// atomically rename over the destination.
    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), json)?;
        tmp.persist(self.record_path(&record.id))
            .map_err(|e| Error::Io(e.error))?;

        self.cache
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<SessionRecord> {
        self.cache
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cache.read().contains_key(id)
    }

    /// All sessions, optionally filtered by project path, newest first.
    pub fn list(&self, project_path: Option<&str>) -> Vec<SessionRecord> {
        let cache = self.cache.read();
        let mut records: Vec<SessionRecord> = cache
            .values()
            .filter(|r| project_path.map_or(true, |p| r.project_path == p))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Delete a session record from disk and cache.
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.cache.write().remove(id).is_none() {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        let path = self.record_path(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SessionState;
    use troupe_domain::message::Message;

    #[test]
    fn save_then_get_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::open(tmp.path()).unwrap();

        let mut record = SessionRecord::new("/proj");
        record.messages.push(Message::user("hello"));
        store.save(&record).unwrap();

        let loaded = store.get(&record.id).unwrap();
        assert_eq!(record, loaded);
    }

    #[test]
    fn records_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let record = SessionRecord::new("/proj");
        {
            let store = SessionStore::open(tmp.path()).unwrap();
            store.save(&record).unwrap();
        }
        let store = SessionStore::open(tmp.path()).unwrap();
        let loaded = store.get(&record.id).unwrap();
        assert_eq!(loaded.project_path, "/proj");
    }

    #[test]
    fn list_filters_by_project_path() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::open(tmp.path()).unwrap();
        store.save(&SessionRecord::new("/a")).unwrap();
        store.save(&SessionRecord::new("/a")).unwrap();
        store.save(&SessionRecord::new("/b")).unwrap();

        assert_eq!(store.list(None).len(), 3);
        assert_eq!(store.list(Some("/a")).len(), 2);
        assert_eq!(store.list(Some("/c")).len(), 0);
    }

    #[test]
    fn delete_removes_disk_and_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::open(tmp.path()).unwrap();
        let record = SessionRecord::new("/p");
        store.save(&record).unwrap();

        store.delete(&record.id).unwrap();
        assert!(store.get(&record.id).is_err());
        assert!(!tmp.path().join("sessions").join(format!("{}.json", record.id)).exists());

        assert!(matches!(
            store.delete(&record.id),
            Err(Error::SessionNotFound(_))
        ));
    }

    #[test]
    fn corrupt_record_skipped_on_open() {
        let tmp = tempfile::tempdir().unwrap();
        let record = SessionRecord::new("/p");
        {
            let store = SessionStore::open(tmp.path()).unwrap();
            store.save(&record).unwrap();
        }
        std::fs::write(tmp.path().join("sessions/garbage.json"), "{not json").unwrap();

        let store = SessionStore::open(tmp.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains(&record.id));
    }

    #[test]
    fn save_updates_state() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::open(tmp.path()).unwrap();
        let mut record = SessionRecord::new("/p");
        store.save(&record).unwrap();

        record.state = SessionState::Completed;
        store.save(&record).unwrap();
        assert_eq!(store.get(&record.id).unwrap().state, SessionState::Completed);
    }
}
