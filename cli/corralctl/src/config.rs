//! Configuration and context management.
//!
//! Handles:
//! - API endpoint configuration, global and per environment
//! - Known environments and their provider settings
//! - Current environment

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use corral_provision::{EnvironmentCapabilities, UpdateBehavior};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Providers that configure machine networking themselves.
const NETWORK_MANAGING_PROVIDERS: &[&str] = &["maas"];

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("dev", "corral", "corral")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint URL for environments that do not set their own.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `CORRAL_API_URL`, which wins over every stored endpoint.
    #[serde(skip)]
    pub api_url_override: Option<String>,

    /// Known environments by name.
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// Current context.
    #[serde(default)]
    pub context: CliContext,
}

fn default_api_url() -> String {
    "http://127.0.0.1:17070".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_url_override: None,
            environments: BTreeMap::new(),
            context: CliContext::default(),
        }
    }
}

impl Config {
    /// Load config from disk, or return default.
    ///
    /// `CORRAL_API_URL` overrides the stored endpoint.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse config from {:?}", path))?
        } else {
            Self::default()
        };

        config.api_url_override = std::env::var("CORRAL_API_URL").ok();
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Get the API URL for an environment.
    pub fn api_url<'a>(&'a self, env: &'a EnvironmentConfig) -> &'a str {
        self.api_url_override
            .as_deref()
            .or(env.api_url.as_deref())
            .unwrap_or(&self.api_url)
    }
}

/// Current CLI context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliContext {
    /// Current environment name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Settings of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Infrastructure provider type, such as `ec2` or `maas`.
    pub provider: String,

    /// Controller endpoint for this environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Series for new machines when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_series: Option<String>,

    #[serde(default = "enabled")]
    pub enable_os_refresh_update: bool,

    #[serde(default = "enabled")]
    pub enable_os_upgrade: bool,
}

fn enabled() -> bool {
    true
}

impl EnvironmentConfig {
    /// What the environment's provider can do.
    pub fn capabilities(&self) -> EnvironmentCapabilities {
        EnvironmentCapabilities {
            manages_networking: NETWORK_MANAGING_PROVIDERS.contains(&self.provider.as_str()),
            update_behavior: UpdateBehavior {
                enable_os_refresh_update: self.enable_os_refresh_update,
                enable_os_upgrade: self.enable_os_upgrade,
            },
        }
    }
}
