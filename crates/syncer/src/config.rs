//! Configuration for the syncer and its polling loop.

use std::path::Path;
use std::time::Duration;

use pipesync_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the `Syncer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Name of the gate consulted before every pass.
    #[serde(default = "default_gate_name")]
    pub gate_name: String,

    /// Interval between passes when driven by `SyncLoop`.
    #[serde(with = "duration_secs", default = "default_interval")]
    pub interval: Duration,

    /// How long `shutdown` waits for tasks to exit.
    #[serde(with = "duration_secs", default = "default_shutdown_timeout")]
    pub shutdown_timeout: Duration,

    /// Buffered events per subscriber before the slowest one lags.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Consecutive skipped passes before the loop logs at error level.
    #[serde(default = "default_max_consecutive_skips")]
    pub max_consecutive_skips: usize,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            gate_name: default_gate_name(),
            interval: default_interval(),
            shutdown_timeout: default_shutdown_timeout(),
            event_capacity: default_event_capacity(),
            max_consecutive_skips: default_max_consecutive_skips(),
        }
    }
}

impl SyncerConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the gate name.
    #[must_use]
    pub fn gate_name(mut self, name: impl Into<String>) -> Self {
        self.gate_name = name.into();
        self
    }

    /// Set the polling interval.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the event buffer capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an empty gate name, a zero
    /// interval, or a zero event capacity.
    pub fn validate(&self) -> Result<()> {
        if self.gate_name.trim().is_empty() {
            return Err(Error::invalid_config("gate_name must not be empty"));
        }
        if self.interval.is_zero() {
            return Err(Error::invalid_config("interval must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config(
                "event_capacity must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParseFailed` for malformed TOML and
    /// `Error::InvalidConfig` when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config_parse_failed(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigReadFailed` when the file cannot be read, and
    /// the errors of [`SyncerConfig::from_toml_str`] otherwise.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_read_failed(path, e.to_string()))?;
        Self::from_toml_str(&content)
    }
}

fn default_gate_name() -> String {
    "scheduler".to_string()
}

const fn default_interval() -> Duration {
    Duration::from_secs(10)
}

const fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_event_capacity() -> usize {
    64
}

const fn default_max_consecutive_skips() -> usize {
    10
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
