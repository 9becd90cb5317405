//! Command-line surface for the `troupe` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use troupe_domain::config::{Config, ConfigSeverity};

/// Troupe — a multi-agent coordination server.
#[derive(Debug, Parser)]
#[command(name = "troupe", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "troupe.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the configuration file and report issues.
    Validate,
    /// Print the effective configuration.
    Show,
}

/// Load the config file, or fall back to defaults when it does not exist
/// (validation will then report the missing providers).
pub fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    if path.exists() {
        Ok(Config::load(path).map_err(|e| anyhow::anyhow!("loading {}: {e}", path.display()))?)
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Print validation issues. Returns false when any are errors.
pub fn validate(config: &Config) -> bool {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => eprintln!("warning: {issue}"),
            ConfigSeverity::Error => eprintln!("error: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors == 0 {
        println!("configuration OK ({} warning(s))", issues.len());
        true
    } else {
        false
    }
}

/// Print the effective configuration as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("error rendering config: {e}"),
    }
}
