//! tmap - project files for a tiled multi-layer image viewer
//!
//! Reads, writes, upgrades and exports `.tmap` projects, and models the
//! viewer state a project is loaded into.

pub mod config;
pub mod convert;
pub mod export;
pub mod format;
pub mod session;
pub mod store;

pub use config::{AppConfig, ConfigError, LogLevel};
pub use format::{FormatError, ProjectState};
pub use session::Session;
