//! Monitor configuration.

use anyhow::{Context, Result};

/// Runtime settings for the polling loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Master switch; a disabled monitor still registers positions but
    /// never polls.
    pub enabled: bool,
    /// Seconds between price polls.
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 5,
        }
    }
}

impl MonitorConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let enabled = match std::env::var("EXIT_MONITOR_ENABLED") {
            Ok(v) => v
                .parse::<bool>()
                .context("EXIT_MONITOR_ENABLED must be true or false")?,
            Err(_) => defaults.enabled,
        };

        let poll_interval_secs = match std::env::var("EXIT_MONITOR_POLL_INTERVAL_SECS") {
            Ok(v) => {
                let secs = v
                    .parse::<u64>()
                    .context("EXIT_MONITOR_POLL_INTERVAL_SECS must be a positive integer")?;
                if secs == 0 {
                    anyhow::bail!("EXIT_MONITOR_POLL_INTERVAL_SECS must be at least 1");
                }
                secs
            }
            Err(_) => defaults.poll_interval_secs,
        };

        Ok(Self {
            enabled,
            poll_interval_secs,
        })
    }
}
