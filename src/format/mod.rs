//! The `.tmap` project format.
//!
//! A project file stores a whole viewing session: layers, dataset buttons,
//! filters, per-layer controls, regions, settings and viewport. This module
//! holds the document types and the codec that moves a document in and out
//! of a [`Session`](crate::session::Session).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tmap::format::ProjectState;
//! use tmap::session::Session;
//!
//! let mut session = Session::new();
//! let report = session.load(ProjectState::from_json(&json)?);
//! session.viewer_mut().finish_layout();
//!
//! let saved = session.save_project("NewProject");
//! std::fs::write("NewProject.tmap", saved.to_json()?)?;
//! ```
//!
//! ## Legacy marker files
//!
//! Marker files written by old versions describe their columns with an
//! `expectedCSV` block. Loading translates it with
//! [`upgrade_marker_file`]; the translation is one-way.

pub mod codec;
mod error;
mod legacy;
mod marker;
pub mod paths;
mod settings;
mod state;

#[cfg(test)]
mod tests;

pub use codec::LoadReport;
pub use error::FormatError;
pub use legacy::{LegacyCsv, SYMBOL_NAMES, upgrade_marker_file};
pub use marker::{ExpectedHeader, ExpectedRadios, FilePath, MarkerFile, MenuButton, RegionFile};
pub use paths::{ImageSource, StaticAssets, common_path, rebase, relative_prefix};
pub use settings::{
    DEFAULT_TOGGLES, ReplayOutcome, ReplaySummary, SettingDescriptor, SettingEntry,
    SettingKey, SettingsRegistry, is_truthy,
};
pub use state::ProjectState;
pub(crate) use state::to_json_indented;
