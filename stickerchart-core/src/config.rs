//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/stickerchart/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/stickerchart/` (~/.config/stickerchart/)
//! - Data: `$XDG_DATA_HOME/stickerchart/` (~/.local/share/stickerchart/)
//! - State/Logs: `$XDG_STATE_HOME/stickerchart/` (~/.local/state/stickerchart/)

use crate::error::{Error, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
    /// Sticker history grouping
    #[serde(default)]
    pub history: HistoryConfig,

    /// Sticker defaults and limits
    #[serde(default)]
    pub stickers: StickerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Widest allowed batch window (one day)
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Widest allowed fallback timestamp step (one second)
pub const MAX_FALLBACK_STEP_MS: u64 = 1_000;

/// Sticker history grouping configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Width of a batch time window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Spacing between fallback timestamps in milliseconds
    #[serde(default = "default_fallback_step_ms")]
    pub fallback_step_ms: u64,

    /// Label shown for stickers added on this device
    #[serde(default = "default_local_label")]
    pub local_label: String,

    /// Label shown for participants without a resolved name
    #[serde(default = "default_shared_label")]
    pub shared_label: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            fallback_step_ms: default_fallback_step_ms(),
            local_label: default_local_label(),
            shared_label: default_shared_label(),
        }
    }
}

impl HistoryConfig {
    /// Batch window as a chrono duration, clamped to [`MAX_WINDOW_SECS`]
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs.min(MAX_WINDOW_SECS) as i64)
    }

    /// Fallback timestamp step as a chrono duration, clamped to
    /// [`MAX_FALLBACK_STEP_MS`]
    pub fn fallback_step(&self) -> Duration {
        Duration::milliseconds(self.fallback_step_ms.min(MAX_FALLBACK_STEP_MS) as i64)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.window_secs == 0 {
            return Err(Error::Config(
                "history.window_secs must be greater than zero".to_string(),
            ));
        }
        if self.window_secs > MAX_WINDOW_SECS {
            return Err(Error::Config(format!(
                "history.window_secs must be at most {}",
                MAX_WINDOW_SECS
            )));
        }
        if self.fallback_step_ms == 0 {
            return Err(Error::Config(
                "history.fallback_step_ms must be greater than zero".to_string(),
            ));
        }
        if self.fallback_step_ms > MAX_FALLBACK_STEP_MS {
            return Err(Error::Config(format!(
                "history.fallback_step_ms must be at most {}",
                MAX_FALLBACK_STEP_MS
            )));
        }
        Ok(())
    }
}

fn default_window_secs() -> u64 {
    120
}

fn default_fallback_step_ms() -> u64 {
    1
}

fn default_local_label() -> String {
    "You".to_string()
}

fn default_shared_label() -> String {
    "Shared user".to_string()
}

/// Sticker defaults
#[derive(Debug, Deserialize, Clone)]
pub struct StickerConfig {
    /// Image used when none is given
    #[serde(default = "default_image")]
    pub default_image: String,

    /// Upper bound on stickers awarded by one quick action
    #[serde(default = "default_max_quick_action_count")]
    pub max_quick_action_count: u32,
}

impl Default for StickerConfig {
    fn default() -> Self {
        Self {
            default_image: default_image(),
            max_quick_action_count: default_max_quick_action_count(),
        }
    }
}

fn default_image() -> String {
    "star".to_string()
}

fn default_max_quick_action_count() -> u32 {
    20
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

        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.history.validate()?;
        if self.stickers.max_quick_action_count == 0 {
            return Err(Error::Config(
                "stickers.max_quick_action_count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/stickerchart/config.toml` (~/.config/stickerchart/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("stickerchart").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/stickerchart/` (~/.local/share/stickerchart/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("stickerchart")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/stickerchart/` (~/.local/state/stickerchart/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("stickerchart")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/stickerchart/data.db` (~/.local/share/stickerchart/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("stickerchart.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// The CLI calls this before anything else reads these env vars so
    /// every component resolves the same paths.
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
