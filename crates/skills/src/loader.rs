//! Recursive SKILL.md discovery.
//!
//! Scans a skills root for directories containing `SKILL.md`, parses each
//! front-matter, enforces that the directory name equals the declared skill
//! name, and enumerates `scripts/`, `references/`, and `assets/` siblings by
//! filename. Invalid skills are logged and skipped; the rest keep loading.

use std::path::{Path, PathBuf};

use troupe_domain::Result;

use crate::manifest::{self, SkillManifest};

/// One indexed skill: metadata plus where to find the full document.
#[derive(Debug, Clone)]
pub struct SkillEntry {
    pub manifest: SkillManifest,
    pub dir: PathBuf,
    pub scripts: Vec<String>,
    pub references: Vec<String>,
    pub assets: Vec<String>,
}

/// Scan the skills root recursively and load all valid skill entries,
/// sorted by name.
pub fn scan_skills(root: &Path) -> Result<Vec<SkillEntry>> {
    let mut entries = Vec::new();
    if !root.exists() {
        return Ok(entries);
    }
    walk(root, &mut entries)?;
    entries.sort_by(|a, b| a.manifest.name.cmp(&b.manifest.name));
    Ok(entries)
}

fn walk(dir: &Path, entries: &mut Vec<SkillEntry>) -> Result<()> {
    let md_path = dir.join("SKILL.md");
    if md_path.is_file() {
        match load_skill_entry(dir, &md_path) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    skill_dir = %dir.display(),
                    error = %e,
                    "skipping skill directory with invalid SKILL.md"
                );
            }
        }
        // A skill directory is a leaf; its subdirectories hold resources,
        // not nested skills.
        return Ok(());
    }

    for child in std::fs::read_dir(dir)? {
        let child = child?;
        let path = child.path();
        if path.is_dir() {
            walk(&path, entries)?;
        }
    }
    Ok(())
}

fn load_skill_entry(dir: &Path, md_path: &Path) -> Result<SkillEntry> {
    let content = std::fs::read_to_string(md_path)?;
    let (manifest, _body) = manifest::parse_skill_md(&content)?;

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if dir_name != manifest.name {
        return Err(troupe_domain::Error::Config(format!(
            "directory '{}' does not match skill name '{}'",
            dir_name, manifest.name
        )));
    }

    Ok(SkillEntry {
        scripts: list_files(&dir.join("scripts")),
        references: list_files(&dir.join("references")),
        assets: list_files(&dir.join("assets")),
        manifest,
        dir: dir.to_path_buf(),
    })
}

/// Sorted filenames of a resource directory; empty when it does not exist.
fn list_files(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(read_dir) = std::fs::read_dir(dir) {
        for entry in read_dir.flatten() {
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    names
}

/// Read the full SKILL.md body for a previously indexed entry.
pub fn load_skill_body(entry: &SkillEntry) -> Result<String> {
    let content = std::fs::read_to_string(entry.dir.join("SKILL.md"))?;
    let (_, body) = manifest::parse_skill_md(&content)?;
    Ok(body)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(root: &Path, name: &str, category: &str, caps: &[&str]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let caps_yaml = caps
            .iter()
            .map(|c| format!("  - {c}"))
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(
            dir.join("SKILL.md"),
            format!(
                "---\nname: {name}\ndescription: {name} things\ncategory: {category}\ncapabilities:\n{caps_yaml}\n---\n# {name}\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn scan_finds_nested_skills() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "shell-execution", "capability", &["run_command"]);
        let nested = tmp.path().join("bundles");
        write_skill(&nested, "git-workflow", "workflow", &["run_command"]);

        let entries = scan_skills(tmp.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.manifest.name.as_str()).collect();
        assert_eq!(names, vec!["git-workflow", "shell-execution"]);
    }

    #[test]
    fn dir_name_mismatch_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("wrong-dir");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            "---\nname: other-name\ndescription: x\ncategory: workflow\n---\nbody\n",
        )
        .unwrap();

        let entries = scan_skills(tmp.path()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn invalid_skill_does_not_block_others() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "good-skill", "capability", &["x"]);
        let bad = tmp.path().join("bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("SKILL.md"), "no front matter here").unwrap();

        let entries = scan_skills(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].manifest.name, "good-skill");
    }

    #[test]
    fn resources_enumerated_by_filename() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "deploy-steps", "workflow", &["run_command"]);
        let dir = tmp.path().join("deploy-steps");
        std::fs::create_dir_all(dir.join("scripts")).unwrap();
        std::fs::write(dir.join("scripts/deploy.sh"), "#!/bin/sh").unwrap();
        std::fs::create_dir_all(dir.join("references")).unwrap();
        std::fs::write(dir.join("references/runbook.md"), "# runbook").unwrap();

        let entries = scan_skills(tmp.path()).unwrap();
        assert_eq!(entries[0].scripts, vec!["deploy.sh"]);
        assert_eq!(entries[0].references, vec!["runbook.md"]);
        assert!(entries[0].assets.is_empty());
    }

    #[test]
    fn body_loaded_on_demand() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path(), "note-taking", "integration", &["write_file"]);
        let entries = scan_skills(tmp.path()).unwrap();
        let body = load_skill_body(&entries[0]).unwrap();
        assert!(body.contains("# note-taking"));
    }
}
