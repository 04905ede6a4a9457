use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use libris_client::ClientConfig;
use libris_client::config::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ProfileConfig {
    /// Output format saved for this profile, if valid.
    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.format
            .as_deref()
            .map(|raw| {
                OutputFormat::from_str(raw, true)
                    .map_err(|_| anyhow::anyhow!("Invalid format in config: {raw}"))
            })
            .transpose()
    }

    /// Applies `key = value`, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => {
                libris_client::config::parse_url(value)?;
                self.server = Some(value.to_string());
            }
            "format" => {
                OutputFormat::from_str(value, true)
                    .map_err(|_| anyhow::anyhow!("Invalid format: {value}. Use json, yaml or table"))?;
                self.format = Some(value.to_lowercase());
            }
            "timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout: {value}"))?;
                anyhow::ensure!(secs > 0, "Timeout must be at least one second");
                self.timeout_secs = Some(secs);
            }
            other => {
                anyhow::bail!("Unknown config key: {other}. Valid keys: server, format, timeout_secs")
            }
        }
        Ok(())
    }
}

pub type ConfigFile = BTreeMap<String, ProfileConfig>;

pub fn libris_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".libris"))
}

fn config_path() -> Result<PathBuf> {
    Ok(libris_dir()?.join("config.toml"))
}

pub fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn save_all_to(path: &Path, all: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, toml::to_string_pretty(all)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    Ok(load_all_from(&config_path()?)?
        .remove(profile)
        .unwrap_or_default())
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    let path = config_path()?;
    let mut all = load_all_from(&path)?;
    all.insert(profile.to_string(), config.clone());
    save_all_to(&path, &all)
}

/// Backend URL: `--server` / `LIBRIS_URL`, then the profile, then the default.
pub fn resolve_server(cli_server: Option<&str>, profile: &ProfileConfig) -> String {
    cli_server
        .or(profile.server.as_deref())
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string()
}

pub fn client_config(cli_server: Option<&str>, profile: &ProfileConfig) -> Result<ClientConfig> {
    let server = resolve_server(cli_server, profile);
    let mut config = ClientConfig::for_server(&server)?;
    if let Some(secs) = profile.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_resolve_server_order() {
        let profile = ProfileConfig {
            server: Some("https://profile.example.com/api/v1/".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_server(Some("https://flag.example.com/"), &profile),
            "https://flag.example.com/"
        );
        assert_eq!(
            resolve_server(None, &profile),
            "https://profile.example.com/api/v1/"
        );
        assert_eq!(
            resolve_server(None, &ProfileConfig::default()),
            DEFAULT_BASE_URL
        );
    }

    #[test]
    fn test_client_config_applies_timeout() {
        let profile = ProfileConfig {
            timeout_secs: Some(30),
            ..Default::default()
        };
        let config = client_config(Some("https://books.example.com/api/v1"), &profile).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.base_url.as_str(), "https://books.example.com/api/v1/");
    }

    #[test]
    fn test_set_validates_values() {
        let mut cfg = ProfileConfig::default();
        cfg.set("format", "TABLE").unwrap();
        assert_eq!(cfg.output_format().unwrap(), Some(OutputFormat::Table));

        assert!(cfg.set("format", "xml").is_err());
        assert!(cfg.set("timeout_secs", "0").is_err());
        assert!(cfg.set("server", "not a url").is_err());
        assert!(cfg.set("colour", "blue").is_err());
    }

    #[test]
    fn test_profiles_round_trip_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(load_all_from(&path).unwrap().is_empty());

        let mut all = ConfigFile::new();
        all.insert(
            "staging".into(),
            ProfileConfig {
                server: Some("https://staging.example.com/api/v1/".into()),
                format: Some("yaml".into()),
                timeout_secs: Some(15),
            },
        );
        save_all_to(&path, &all).unwrap();

        let loaded = load_all_from(&path).unwrap();
        assert_eq!(loaded, all);
        assert!(fs::read_to_string(&path).unwrap().contains("[staging]"));
    }
}
