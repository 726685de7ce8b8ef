//! Configuration file support for the tmap tools.
//!
//! The configuration names the project store root, how deep folder listings
//! go, and the toggles new sessions start with.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::{DEFAULT_TOGGLES, SettingEntry};
use crate::session::Session;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Folder served as the project store
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,

    /// How many folder levels a file tree listing descends
    #[serde(default = "default_folder_depth")]
    pub folder_depth: usize,

    /// Name used when saving a project that has none
    #[serde(default = "default_project_name")]
    pub default_project: String,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Toggles applied to every new session
    #[serde(default = "default_toggles")]
    pub toggles: Vec<SettingEntry>,
}

fn default_app_name() -> String {
    "tmap".to_string()
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_folder_depth() -> usize {
    4
}

fn default_project_name() -> String {
    "NewProject".to_string()
}

fn default_toggles() -> Vec<SettingEntry> {
    DEFAULT_TOGGLES
        .iter()
        .map(|t| SettingEntry::new(t.module, t.function, false))
        .collect()
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            store_root: default_store_root(),
            folder_depth: default_folder_depth(),
            default_project: default_project_name(),
            log_level: LogLevel::default(),
            toggles: default_toggles(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "tmap-config.json"
    }

    /// Default config file path, under the user config directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("tmap").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home| {
                home.join(".config")
                    .join("tmap")
                    .join(Self::default_filename())
            })
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_file(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn save_to_default_path(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to_file(&path)?;
        Ok(path)
    }

    /// A session with the configured toggles already applied.
    pub fn new_session(&self) -> Session {
        let mut session = Session::new();
        for toggle in &self.toggles {
            let on = crate::format::is_truthy(&toggle.value);
            session.toggle_setting(&toggle.module, &toggle.function, on);
        }
        session
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}
