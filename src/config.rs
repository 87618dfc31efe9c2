//! Configuration module for pathwarden.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.pathwarden/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PATHWARDEN_` and use double
//! underscores to separate nested levels:
//! - `PATHWARDEN_WATCHER__POLL_INTERVAL_MS=250` sets `watcher.poll_interval_ms`
//! - `PATHWARDEN_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::{PlatformChoice, WatchMode};

/// Directory holding the settings file, searched from the current directory up.
pub const CONFIG_DIR: &str = ".pathwarden";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Watcher timing and backend selection
    #[serde(default)]
    pub watcher: WatcherTuning,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,

    /// One entry per watched root
    #[serde(default)]
    pub watches: Vec<WatchSettings>,
}

/// A single watched root.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct WatchSettings {
    /// File or directory to watch. Unset means the watcher idles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<PathBuf>,

    /// `file` or `dir`
    #[serde(default)]
    pub mode: WatchMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherTuning {
    /// How often to check for the root while it is missing, and for its
    /// loss while watching
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on native source teardown
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Modify notifications for the same path inside this window are merged
    #[serde(default = "default_coalesce_window_ms")]
    pub coalesce_window_ms: u64,

    /// Native notification dialect: `auto`, `posix` or `windows`
    #[serde(default)]
    pub platform: PlatformChoice,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `normalizer = "trace"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_poll_interval_ms() -> u64 {
    crate::watcher::DEFAULT_POLL_INTERVAL_MS
}
fn default_stop_timeout_secs() -> u64 {
    10
}
fn default_coalesce_window_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watcher: WatcherTuning::default(),
            logging: LoggingConfig::default(),
            watches: Vec::new(),
        }
    }
}

impl Default for WatcherTuning {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_secs: default_stop_timeout_secs(),
            coalesce_window_ms: default_coalesce_window_ms(),
            platform: PlatformChoice::default(),
        }
    }
}

impl WatcherTuning {
    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin the waiter
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(&config_path).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file (environment still applies)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels; single underscores
            // stay inside field names
            .merge(Env::prefixed("PATHWARDEN_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the settings file by looking for the config directory
    /// from the current directory up to the filesystem root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");
        Self::write_default(&config_path, force)?;
        Ok(config_path)
    }

    fn write_default(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        // Example entry so the generated file documents the table shape
        settings.watches.push(WatchSettings {
            input_path: std::env::current_dir().ok(),
            mode: WatchMode::Dir,
        });

        settings.save(config_path)?;
        Ok(())
    }
}
