//! YAML agent-definition loading.
//!
//! One file per agent in the agents directory. Editor droppings and other
//! temp files are ignored; files that fail to parse or validate are logged
//! and skipped so the rest of the directory still loads.

use std::path::Path;

use troupe_domain::agentdef::AgentDefinition;
use troupe_domain::{Error, Result};

/// Returns true for temp/backup files the loader and watcher must ignore.
pub fn is_ignored_file(file_name: &str) -> bool {
    file_name.starts_with('.')
        || file_name.ends_with('~')
        || file_name.ends_with(".swp")
        || file_name.ends_with(".tmp")
        || file_name.ends_with(".bak")
        || (file_name.starts_with('#') && file_name.ends_with('#'))
}

/// True when the file looks like an agent definition worth parsing.
pub fn is_definition_file(path: &Path) -> bool {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };
    if is_ignored_file(file_name) {
        return false;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Parse and validate a single definition file.
pub fn load_definition(path: &Path) -> Result<AgentDefinition> {
    let raw = std::fs::read_to_string(path)?;
    let def: AgentDefinition =
        serde_yaml::from_str(&raw).map_err(|e| Error::Yaml(e.to_string()))?;
    let issues = def.validate();
    if !issues.is_empty() {
        return Err(Error::Config(issues.join("; ")));
    }
    Ok(def)
}

/// Load every valid definition in the directory, sorted by name.
///
/// Returns an error only when the directory itself is unreadable; bad
/// individual files are logged and skipped.
pub fn load_definitions(dir: &Path) -> Result<Vec<AgentDefinition>> {
    let mut defs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_definition_file(&path) {
            continue;
        }
        match load_definition(&path) {
            Ok(def) => defs.push(def),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    error = %e,
                    "skipping invalid agent definition"
                );
            }
        }
    }
    defs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(defs)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
name: developer
display_name: Developer
description: Writes and edits code
system_prompt: You are a developer on a small team.
capabilities: [coding]
skills: [filesystem-operations]
model:
  provider: main
  model_name: claude-sonnet-4-20250514
  temperature: 0.3
  max_tokens: 4096
tools:
  allowed: [active_tool, write_file, read_file]
  denied: [run_command]
"#;

    #[test]
    fn ignored_file_patterns() {
        for name in [
            ".hidden.yaml",
            "agent.yaml~",
            "agent.yaml.swp",
            "agent.yaml.tmp",
            "agent.yaml.bak",
            "#agent.yaml#",
        ] {
            assert!(is_ignored_file(name), "{name} should be ignored");
        }
        assert!(!is_ignored_file("developer.yaml"));
    }

    #[test]
    fn only_yaml_extensions_are_definitions() {
        assert!(is_definition_file(Path::new("/x/developer.yaml")));
        assert!(is_definition_file(Path::new("/x/developer.yml")));
        assert!(!is_definition_file(Path::new("/x/notes.md")));
        assert!(!is_definition_file(Path::new("/x/.developer.yaml")));
    }

    #[test]
    fn load_valid_definition() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("developer.yaml");
        std::fs::write(&path, VALID_YAML).unwrap();

        let def = load_definition(&path).unwrap();
        assert_eq!(def.name, "developer");
        assert_eq!(def.model.temperature, 0.3);
        assert!(def.tools.allows("write_file"));
        assert!(!def.tools.allows("run_command"));
    }

    #[test]
    fn invalid_file_skipped_others_load() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("developer.yaml"), VALID_YAML).unwrap();
        std::fs::write(tmp.path().join("broken.yaml"), "name: [unclosed").unwrap();
        std::fs::write(tmp.path().join("developer.yaml~"), VALID_YAML).unwrap();

        let defs = load_definitions(tmp.path()).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "developer");
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hot.yaml");
        std::fs::write(&path, VALID_YAML.replace("temperature: 0.3", "temperature: 3.0")).unwrap();
        assert!(load_definition(&path).is_err());
    }

    #[test]
    fn unreadable_directory_is_an_error() {
        assert!(load_definitions(Path::new("/definitely/not/a/dir")).is_err());
    }
}
