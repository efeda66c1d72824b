//! CLI configuration commands.
//!
//! Values live in `~/.zigma/config.toml`.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::output::{self, OutputFormat};

/// Keys the CLI reads.
pub const KNOWN_KEYS: &[&str] = &["api-url", "email"];

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Configuration key (api-url, email)
        key: String,
        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show all configuration
    Show,

    /// Remove the configuration file
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl CliConfig {
    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !KNOWN_KEYS.contains(&key) {
            anyhow::bail!(
                "Unknown key '{}'; expected one of: {}",
                key,
                KNOWN_KEYS.join(", ")
            );
        }
        if key == "api-url" && !(value.starts_with("http://") || value.starts_with("https://")) {
            anyhow::bail!("api-url must start with http:// or https://");
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".zigma").join("config.toml"))
}

/// Defaults when the file does not exist.
fn load_config() -> Result<CliConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    CliConfig::parse(&content)
}

fn save_config(cfg: &CliConfig) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(cfg).context("Failed to serialize config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// A stored value, if the file exists and sets it.
pub fn load_value(key: &str) -> Option<String> {
    load_config()
        .ok()
        .and_then(|cfg| cfg.values.get(key).cloned())
}

pub async fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => {
            let mut cfg = load_config()?;
            cfg.set(&key, &value)?;
            save_config(&cfg)?;

            match format {
                OutputFormat::Table => output::print_success(&format!("{} = {}", key, value)),
                _ => output::print_item(&serde_json::json!({ "key": key, "value": value }), format),
            }
        }

        ConfigCommands::Get { key } => {
            let cfg = load_config()?;
            let Some(value) = cfg.values.get(&key) else {
                anyhow::bail!("Key '{}' is not set", key);
            };
            match format {
                OutputFormat::Table => println!("{}", value),
                _ => output::print_item(&serde_json::json!({ "key": key, "value": value }), format),
            }
        }

        ConfigCommands::Show => {
            let cfg = load_config()?;
            if cfg.values.is_empty() {
                output::print_info("No configuration values set.");
                return Ok(());
            }

            match format {
                OutputFormat::Table => {
                    output::print_header("Configuration");
                    for (k, v) in &cfg.values {
                        output::print_detail(k, v);
                    }
                }
                _ => output::print_item(&cfg.values, format),
            }
        }

        ConfigCommands::Reset { force } => {
            if !force {
                output::print_warning("This removes all CLI configuration. Use --force to confirm.");
                return Ok(());
            }

            let path = config_path()?;
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            output::print_success("Configuration reset");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_rejects_unknown_key() {
        let mut cfg = CliConfig::default();
        assert!(cfg.set("colour", "blue").is_err());
        assert!(cfg.values.is_empty());
    }

    #[test]
    fn test_set_validates_api_url() {
        let mut cfg = CliConfig::default();
        assert!(cfg.set("api-url", "localhost:5173").is_err());
        cfg.set("api-url", "http://127.0.0.1:5173").unwrap();
        assert_eq!(cfg.values["api-url"], "http://127.0.0.1:5173");
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut cfg = CliConfig::default();
        cfg.set("email", "admin@zigma.io").unwrap();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = CliConfig::parse(&text).unwrap();
        assert_eq!(parsed.values.get("email").map(String::as_str), Some("admin@zigma.io"));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert!(CliConfig::parse("").unwrap().values.is_empty());
    }
}
