//! In-memory skill index with weighted substring search.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;

use troupe_domain::{Error, Result};

use crate::loader::{self, SkillEntry};

/// Default number of search results when the caller does not ask for more.
pub const DEFAULT_MAX_RESULTS: usize = 5;
/// Hard cap on search results regardless of what the caller asks for.
pub const MAX_RESULTS_CAP: usize = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Result types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct SkillHit {
    pub name: String,
    pub description: String,
    pub category: String,
    pub capabilities: Vec<String>,
    pub score: f64,
}

/// A fully loaded skill: body plus enumerated resources.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedSkill {
    pub name: String,
    pub description: String,
    pub category: String,
    pub capabilities: Vec<String>,
    pub body: String,
    pub scripts: Vec<String>,
    pub references: Vec<String>,
    pub assets: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SkillIndex
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read-mostly skill index. Reloads take the write lock; searches and
/// loads take the read lock.
pub struct SkillIndex {
    entries: RwLock<Vec<SkillEntry>>,
    root: PathBuf,
}

impl SkillIndex {
    /// Load the index from a skills root directory.
    pub fn load(root: &Path) -> Result<Self> {
        let entries = loader::scan_skills(root)?;
        tracing::info!(
            skills_count = entries.len(),
            root = %root.display(),
            "skill index loaded"
        );
        Ok(Self {
            entries: RwLock::new(entries),
            root: root.to_path_buf(),
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            root: PathBuf::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Rescan the skills root and swap in the new entries.
    pub fn reload(&self) -> Result<usize> {
        let new_entries = loader::scan_skills(&self.root)?;
        let count = new_entries.len();
        *self.entries.write() = new_entries;
        tracing::info!(skills_count = count, "skill index reloaded");
        Ok(count)
    }

    /// Weighted substring search over the indexed metadata.
    ///
    /// Per lowercased whitespace token: +3.0 for a hit on the name, +2.5
    /// per hit on a capability entry, +2.0 for a hit on the description,
    /// +1.5 for a hit on the category. Zero-scoring skills are excluded;
    /// results are score-descending (ties broken by name), truncated to
    /// `max_results` (default 5, cap 10).
    pub fn search(&self, query: &str, max_results: Option<usize>) -> Vec<SkillHit> {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let limit = max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_CAP);

        let entries = self.entries.read();
        let mut hits: Vec<SkillHit> = entries
            .iter()
            .filter_map(|entry| {
                let score = score_entry(entry, &tokens);
                if score > 0.0 {
                    Some(SkillHit {
                        name: entry.manifest.name.clone(),
                        description: entry.manifest.description.clone(),
                        category: entry.manifest.category.as_str().to_string(),
                        capabilities: entry.manifest.capabilities.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        hits.truncate(limit);
        hits
    }

    /// Metadata for one skill by exact name, without touching disk.
    pub fn get(&self, skill_name: &str) -> Option<SkillHit> {
        self.entries
            .read()
            .iter()
            .find(|e| e.manifest.name == skill_name)
            .map(|e| SkillHit {
                name: e.manifest.name.clone(),
                description: e.manifest.description.clone(),
                category: e.manifest.category.as_str().to_string(),
                capabilities: e.manifest.capabilities.clone(),
                score: 0.0,
            })
    }

    /// Load a skill's full body and enumerated resources by name.
    pub fn load_skill(&self, skill_name: &str) -> Result<LoadedSkill> {
        let entry = {
            let entries = self.entries.read();
            entries
                .iter()
                .find(|e| e.manifest.name == skill_name)
                .cloned()
                .ok_or_else(|| Error::SkillNotFound(skill_name.to_string()))?
        };
        let body = loader::load_skill_body(&entry)?;
        Ok(LoadedSkill {
            name: entry.manifest.name,
            description: entry.manifest.description,
            category: entry.manifest.category.as_str().to_string(),
            capabilities: entry.manifest.capabilities,
            body,
            scripts: entry.scripts,
            references: entry.references,
            assets: entry.assets,
        })
    }

    /// All indexed skill names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.manifest.name.clone())
            .collect()
    }
}

fn score_entry(entry: &SkillEntry, tokens: &[String]) -> f64 {
    let name = entry.manifest.name.to_lowercase();
    let description = entry.manifest.description.to_lowercase();
    let category = entry.manifest.category.as_str();
    let capabilities: Vec<String> = entry
        .manifest
        .capabilities
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    let mut score = 0.0;
    for token in tokens {
        if name.contains(token.as_str()) {
            score += 3.0;
        }
        for cap in &capabilities {
            if cap.contains(token.as_str()) {
                score += 2.5;
            }
        }
        if description.contains(token.as_str()) {
            score += 2.0;
        }
        if category.contains(token.as_str()) {
            score += 1.5;
        }
    }
    score
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
