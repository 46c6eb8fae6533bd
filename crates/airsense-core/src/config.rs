//! Reader configuration stored as JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::poll::PollConfig;
use crate::protocol::{
    SessionConfig, SyncMode, DEFAULT_BAUD_RATE, DEFAULT_SETTLE_DELAY_MS, DEFAULT_TIMEOUT_MS,
    MAX_RESYNC_LOOKAHEAD,
};

/// Errors loading or saving a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File is not valid configuration JSON
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Settings that can never produce a reading
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Particulate sensor link
    #[serde(default)]
    pub particulate: ParticulateSettings,

    /// Poll cadence
    #[serde(default)]
    pub poll: PollSettings,
}

/// Particulate sensor link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticulateSettings {
    /// Serial port name; `None` picks the first candidate port
    #[serde(default)]
    pub port: Option<String>,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Bounded wait for a full frame in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause between flush and read in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Extra bytes to capture and scan for sync bytes; `None` keeps windows aligned.
    /// At most `MAX_RESYNC_LOOKAHEAD`.
    #[serde(default)]
    pub resync_lookahead: Option<usize>,

    /// Reject frames with a bad tail byte
    #[serde(default)]
    pub strict_tail: bool,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

impl Default for ParticulateSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            resync_lookahead: None,
            strict_tail: false,
        }
    }
}

impl ParticulateSettings {
    /// Session configuration for these settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.timeout_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            sync: match self.resync_lookahead {
                Some(lookahead) => SyncMode::Scan { lookahead },
                None => SyncMode::Aligned,
            },
            strict_tail: self.strict_tail,
        }
    }

    /// Worst-case wall-clock time of one read
    pub fn worst_case_read(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms.saturating_add(self.timeout_ms))
    }
}

/// Poll cadence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Time between samples in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Extra attempts per sample after a transient fault
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause before a retry in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Abandon a read that has not returned after this many milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    250
}

fn default_deadline_ms() -> u64 {
    3000
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl PollSettings {
    /// Poller configuration for these settings
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.interval_ms),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            deadline: Duration::from_millis(self.deadline_ms),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that could never produce a reading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particulate.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be non-zero".to_string()));
        }
        if self.particulate.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be non-zero".to_string()));
        }
        if let Some(lookahead) = self.particulate.resync_lookahead {
            if lookahead > MAX_RESYNC_LOOKAHEAD {
                return Err(ConfigError::Invalid(format!(
                    "resync_lookahead ({}) must not exceed {}",
                    lookahead, MAX_RESYNC_LOOKAHEAD
                )));
            }
        }
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Invalid("interval_ms must be non-zero".to_string()));
        }
        let worst_case = self.particulate.worst_case_read();
        if Duration::from_millis(self.poll.deadline_ms) <= worst_case {
            return Err(ConfigError::Invalid(format!(
                "deadline_ms ({}) must exceed settle_delay_ms + timeout_ms ({})",
                self.poll.deadline_ms,
                worst_case.as_millis()
            )));
        }
        Ok(())
    }
}
