//! Skill discovery, indexing, and search.
//!
//! A skill is a directory containing a `SKILL.md` whose YAML front-matter
//! declares name, description, category, and capabilities; optional
//! `scripts/`, `references/`, and `assets/` sibling directories are indexed
//! by filename. The [`SkillIndex`] serves weighted substring search over
//! the metadata and loads full documents on demand.

pub mod index;
pub mod loader;
pub mod manifest;
pub mod watcher;

pub use index::{LoadedSkill, SkillHit, SkillIndex};
pub use manifest::{SkillCategory, SkillManifest};
pub use watcher::SkillWatcher;
