//! SKILL.md front-matter — the YAML block delimited by `---` at the top of
//! the file.
//!
//! Required fields:
//! ```yaml
//! ---
//! name: filesystem-operations
//! description: Read and write files in the workspace
//! category: capability
//! capabilities: [read_file, write_file]
//! ---
//! ```

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Name validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Maximum description length accepted by validation.
pub const MAX_DESCRIPTION_LEN: usize = 1024;

/// Validates a skill name: `^[a-z0-9]([a-z0-9-]{0,62}[a-z0-9])?$`, no `--`.
pub fn is_valid_skill_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 64 || name.contains("--") {
        return false;
    }
    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes.iter().all(|&b| alnum(b) || b == b'-')
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SkillManifest
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Capability,
    Workflow,
    Integration,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Capability => "capability",
            SkillCategory::Workflow => "workflow",
            SkillCategory::Integration => "integration",
        }
    }
}

/// Parsed front-matter from a SKILL.md file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl SkillManifest {
    /// Validate the manifest. Returns the reasons it is unusable, empty
    /// when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !is_valid_skill_name(&self.name) {
            issues.push(format!("invalid skill name '{}'", self.name));
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            issues.push(format!(
                "skill '{}': description exceeds {MAX_DESCRIPTION_LEN} chars",
                self.name
            ));
        }
        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Front-matter splitting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Split a SKILL.md into `(front-matter YAML, body)`.
///
/// Returns `None` when the file does not start with a `---` fence or the
/// closing fence is missing.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    // Find the closing fence on its own line.
    for marker in ["\n---\n", "\n---\r\n"] {
        if let Some(pos) = rest.find(marker) {
            return Some((&rest[..pos], &rest[pos + marker.len()..]));
        }
    }
    // Closing fence at EOF.
    if let Some(yaml) = rest.strip_suffix("\n---") {
        return Some((yaml, ""));
    }
    None
}

/// Parse a SKILL.md into its manifest and body.
pub fn parse_skill_md(content: &str) -> troupe_domain::Result<(SkillManifest, String)> {
    let (yaml, body) = split_frontmatter(content).ok_or_else(|| {
        troupe_domain::Error::Config("SKILL.md has no front-matter block".into())
    })?;
    let manifest: SkillManifest =
        serde_yaml::from_str(yaml).map_err(|e| troupe_domain::Error::Yaml(e.to_string()))?;
    let issues = manifest.validate();
    if !issues.is_empty() {
        return Err(troupe_domain::Error::Config(issues.join("; ")));
    }
    Ok((manifest, body.to_string()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["a", "a1", "filesystem-operations", "shell-execution", "x0-y1-z2"] {
            assert!(is_valid_skill_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_names() {
        for name in [
            "",
            "-leading",
            "trailing-",
            "double--dash",
            "UPPER",
            "under_score",
            "has space",
        ] {
            assert!(!is_valid_skill_name(name), "{name} should be invalid");
        }
    }

    #[test]
    fn name_length_cap() {
        let max = "a".repeat(64);
        assert!(is_valid_skill_name(&max));
        let too_long = "a".repeat(65);
        assert!(!is_valid_skill_name(&too_long));
    }

    #[test]
    fn split_basic_frontmatter() {
        let content = "---\nname: x\n---\nbody text\n";
        let (yaml, body) = split_frontmatter(content).unwrap();
        assert_eq!(yaml, "name: x");
        assert_eq!(body, "body text\n");
    }

    #[test]
    fn split_requires_opening_fence() {
        assert!(split_frontmatter("name: x\n---\n").is_none());
    }

    #[test]
    fn parse_full_skill_md() {
        let content = "---\nname: filesystem-operations\ndescription: read and write files\ncategory: capability\ncapabilities:\n  - read_file\n  - write_file\n---\n# Filesystem\n\nHow to read and write.\n";
        let (manifest, body) = parse_skill_md(content).unwrap();
        assert_eq!(manifest.name, "filesystem-operations");
        assert_eq!(manifest.category, SkillCategory::Capability);
        assert_eq!(manifest.capabilities, vec!["read_file", "write_file"]);
        assert!(body.starts_with("# Filesystem"));
    }

    #[test]
    fn parse_rejects_invalid_name() {
        let content = "---\nname: Bad--Name\ndescription: x\ncategory: workflow\n---\nbody\n";
        assert!(parse_skill_md(content).is_err());
    }

    #[test]
    fn parse_rejects_oversize_description() {
        let long = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        let content = format!("---\nname: ok\ndescription: {long}\ncategory: workflow\n---\nbody\n");
        assert!(parse_skill_md(&content).is_err());
    }

    #[test]
    fn parse_rejects_unknown_category() {
        let content = "---\nname: ok\ndescription: x\ncategory: wizardry\n---\nbody\n";
        assert!(parse_skill_md(content).is_err());
    }
}
