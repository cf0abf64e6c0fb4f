//! Configuration file for the `openfire` tool
//!
//! Stored as TOML at `~/.config/openfire/config.toml`. Every key is optional;
//! a missing file or missing key falls back to the protocol defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use openfire_device::SessionConfig;
use openfire_transport::protocol::{timing, BAUD_RATE, VENDOR_ID};
use openfire_transport::FieldMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// How record fields are framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FieldModeSetting {
    /// Decide from the probe reply
    #[default]
    Auto,
    /// One comma-separated line per record
    Comma,
    /// One line per field (older firmware)
    PerLine,
}

impl FieldModeSetting {
    /// The mode to force on the session, if any
    pub fn forced(self) -> Option<FieldMode> {
        match self {
            Self::Auto => None,
            Self::Comma => Some(FieldMode::Comma),
            Self::PerLine => Some(FieldMode::PerLine),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Port to open when `--port` is not given
    pub port: Option<String>,
    pub baud_rate: u32,
    /// USB vendor id that marks a port as an OpenFIRE board
    pub vendor_id: u16,
    pub probe_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub identity_timeout_ms: u64,
    pub clear_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub field_mode: FieldModeSetting,
    /// Used when neither `RUST_LOG` nor `--log-level` is set
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: BAUD_RATE,
            vendor_id: VENDOR_ID,
            probe_timeout_ms: timing::PROBE_TIMEOUT_MS,
            read_timeout_ms: timing::READ_TIMEOUT_MS,
            identity_timeout_ms: timing::IDENTITY_TIMEOUT_MS,
            clear_timeout_ms: timing::CLEAR_TIMEOUT_MS,
            heartbeat_interval_ms: timing::HEARTBEAT_INTERVAL_MS,
            field_mode: FieldModeSetting::Auto,
            log_level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("openfire")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to a file, creating the parent directory
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Session timing derived from this file; unlisted timings keep their
    /// protocol defaults
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            identity_timeout: Duration::from_millis(self.identity_timeout_ms),
            clear_timeout: Duration::from_millis(self.clear_timeout_ms),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            field_mode: self.field_mode.forced(),
            ..SessionConfig::default()
        }
    }
}
