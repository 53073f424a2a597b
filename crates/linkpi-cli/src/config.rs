//! Configuration file handling for linkpi-cli

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use linkpi_client::{ClientConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};

/// Poll interval used when none is configured
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;
/// Shortest accepted poll interval
pub const MIN_SCAN_INTERVAL_SECS: u64 = 10;
/// Longest accepted poll interval
pub const MAX_SCAN_INTERVAL_SECS: u64 = 3600;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Encoder address
    pub host: Option<String>,
    /// Login user name
    pub username: Option<String>,
    /// Login password
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Seconds between polls in `monitor`
    pub scan_interval: Option<u64>,
    /// Per-request timeout in seconds
    pub timeout: Option<u64>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

/// Values given on the command line (or through the environment)
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides<'a> {
    pub host: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub scan_interval: Option<u64>,
    pub timeout: Option<u64>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("linkpi");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides<'_>) -> Result<MergedConfig> {
        let host = args
            .host
            .map(String::from)
            .or_else(|| self.host.clone())
            .context("No encoder host given (use --host or set `host` in the config file)")?;
        let username = args
            .username
            .map(String::from)
            .or_else(|| self.username.clone())
            .context("No user name given (use --username or set `username` in the config file)")?;
        let password = args
            .password
            .map(String::from)
            .or_else(|| self.password.clone())
            .unwrap_or_default();

        let scan_interval = args
            .scan_interval
            .or(self.scan_interval)
            .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS);
        if !(MIN_SCAN_INTERVAL_SECS..=MAX_SCAN_INTERVAL_SECS).contains(&scan_interval) {
            bail!(
                "Scan interval must be between {} and {} seconds, got {}",
                MIN_SCAN_INTERVAL_SECS,
                MAX_SCAN_INTERVAL_SECS,
                scan_interval
            );
        }

        let timeout = args
            .timeout
            .or(self.timeout)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(MergedConfig {
            client: ClientConfig::new(host, username, password).with_timeout_secs(timeout),
            scan_interval: Duration::from_secs(scan_interval),
            no_color: args.no_color || self.no_color.unwrap_or(false),
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub client: ClientConfig,
    pub scan_interval: Duration,
    pub no_color: bool,
}
