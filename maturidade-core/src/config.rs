//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/maturidade/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/maturidade/` (~/.config/maturidade/)
//! - Data: `$XDG_DATA_HOME/maturidade/` (~/.local/share/maturidade/)
//! - State/Logs: `$XDG_STATE_HOME/maturidade/` (~/.local/state/maturidade/)

use crate::analytics::RangePreset;
use crate::error::{Error, Result};
use crate::types::SnapshotType;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "maturidade";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Snapshot and dashboard defaults
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// CSV export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics configuration
#[derive(Debug, Deserialize)]
pub struct AnalyticsConfig {
    /// Bucket granularity used when a command does not name one
    #[serde(default = "default_snapshot_type")]
    pub default_snapshot_type: SnapshotType,

    /// Date range preset used when a command does not name one
    #[serde(default = "default_range")]
    pub default_range: RangePreset,

    /// Build the current bucket when a dashboard read finds no snapshots
    #[serde(default = "default_backfill_on_empty")]
    pub backfill_on_empty: bool,

    /// Default age (days) for `cleanup --older-than-days`
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_snapshot_type: default_snapshot_type(),
            default_range: default_range(),
            backfill_on_empty: default_backfill_on_empty(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_snapshot_type() -> SnapshotType {
    SnapshotType::Monthly
}

fn default_range() -> RangePreset {
    RangePreset::SixMonths
}

fn default_backfill_on_empty() -> bool {
    true
}

fn default_retention_days() -> u32 {
    730
}

/// CSV export configuration
#[derive(Debug, Deserialize, Default)]
pub struct ExportConfig {
    /// Directory for exported CSV files (current directory when unset)
    pub output_dir: Option<PathBuf>,
}

impl ExportConfig {
    /// Resolve the output directory, preferring an explicit override.
    pub fn resolve_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/maturidade/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join(APP_DIR)
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/maturidade/data.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log directory; files inside rotate daily as
    /// `maturidade.YYYY-MM-DD.log`
    pub fn log_dir() -> PathBuf {
        Self::state_dir()
    }

    /// Ensure XDG base directory environment variables are set.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
