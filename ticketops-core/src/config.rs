//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/ticketops/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/ticketops/` (~/.config/ticketops/)
//! - Data: `$XDG_DATA_HOME/ticketops/` (~/.local/share/ticketops/)
//! - State/Logs: `$XDG_STATE_HOME/ticketops/` (~/.local/state/ticketops/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

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
    /// Database location override
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Dashboard defaults and listing caps
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file; defaults to the XDG data dir
    pub path: Option<PathBuf>,
}

/// Dashboard defaults and listing caps
#[derive(Debug, Deserialize)]
pub struct DashboardConfig {
    /// Default reporting window in days, ending today
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Cap on the active-tickets listing
    #[serde(default = "default_tickets_limit")]
    pub tickets_limit: usize,

    /// Cap on the recent-actions listing
    #[serde(default = "default_actions_limit")]
    pub actions_limit: usize,

    /// Cap on the per-classifier count chart
    #[serde(default = "default_classifier_limit")]
    pub classifier_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            tickets_limit: default_tickets_limit(),
            actions_limit: default_actions_limit(),
            classifier_limit: default_classifier_limit(),
        }
    }
}

fn default_window_days() -> u32 {
    60
}

fn default_tickets_limit() -> usize {
    50
}

fn default_actions_limit() -> usize {
    100
}

fn default_classifier_limit() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (overridable via RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the XDG config path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Path to the config file
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("ticketops").join("config.toml")
    }

    /// Directory for application data (the database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("ticketops")
    }

    /// Directory for state files (logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("ticketops")
    }

    /// Path to the log file
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("ticketops.log")
    }

    /// Resolved database path: explicit config value or the XDG default.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("ticketops.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dashboard.window_days, 60);
        assert_eq!(config.dashboard.tickets_limit, 50);
        assert_eq!(config.dashboard.actions_limit, 100);
        assert_eq!(config.dashboard.classifier_limit, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [dashboard]
            window_days = 30

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.dashboard.window_days, 30);
        assert_eq!(config.dashboard.tickets_limit, 50);
        assert_eq!(config.logging.level, "debug");
    }
}
