//! Configuration for the controller workers.

use std::time::Duration;

use anyhow::{ensure, Context, Result};

const DEFAULT_API_URL: &str = "http://127.0.0.1:17070";
const DEFAULT_CHARM_REVISION_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_TOOLS_CHECK_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Controller API URL.
    pub api_url: String,

    /// How often charm revisions are refreshed.
    pub charm_revision_interval: Duration,

    /// How often the latest tools version is checked.
    pub tools_check_interval: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("CORRAL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let charm_revision_interval = interval(
            &lookup,
            "CORRAL_CHARM_REVISION_INTERVAL_SECS",
            DEFAULT_CHARM_REVISION_INTERVAL_SECS,
        )?;
        let tools_check_interval = interval(
            &lookup,
            "CORRAL_TOOLS_CHECK_INTERVAL_SECS",
            DEFAULT_TOOLS_CHECK_INTERVAL_SECS,
        )?;

        let log_level = lookup("CORRAL_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            api_url,
            charm_revision_interval,
            tools_check_interval,
            log_level,
        })
    }
}

fn interval(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    let secs = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))?,
        None => default,
    };
    ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}
