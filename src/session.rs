//! The application session: viewer model, settings registry and the active
//! project document.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tmap_viewer::{Layer, ViewerState};

use crate::format::{
    DEFAULT_TOGGLES, ExpectedHeader, ExpectedRadios, FilePath, FormatError, LoadReport,
    MarkerFile, ProjectState, ReplayOutcome, SettingDescriptor, SettingEntry, SettingsRegistry,
    codec, is_truthy, relative_prefix,
};

/// An open dataset tab a marker button can be generated from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetTab {
    /// Dataset key, used as the marker file `uid`
    pub uid: String,
    /// Tab name shown to the user
    pub name: String,
    /// Button the dataset was loaded from, if any
    pub from_button: Option<usize>,
    /// Current dropdown values
    pub header: ExpectedHeader,
    /// Current radio and checkbox states
    pub radios: ExpectedRadios,
}

/// Explicit application state shared by every project operation.
#[derive(Debug)]
pub struct Session {
    pub(crate) viewer: ViewerState,
    pub(crate) settings: SettingsRegistry<ViewerState>,
    pub(crate) active: ProjectState,
    pub(crate) slide_filename: Option<String>,
    /// Folder of the project on the server, used to resolve `regionFile`
    pub(crate) base_path: Option<String>,
    pub(crate) region_requests: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            viewer: ViewerState::new(),
            settings: default_registry(),
            active: ProjectState::new(),
            slide_filename: None,
            base_path: None,
            region_requests: Vec::new(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut ViewerState {
        &mut self.viewer
    }

    /// The last loaded document, as amended by later interactions.
    pub fn active(&self) -> &ProjectState {
        &self.active
    }

    pub fn settings(&self) -> &SettingsRegistry<ViewerState> {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsRegistry<ViewerState> {
        &mut self.settings
    }

    pub fn slide_filename(&self) -> Option<&str> {
        self.slide_filename.as_deref()
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Region file fetches queued by loads, drained by the host.
    pub fn take_region_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.region_requests)
    }

    // ---- load / save ----

    pub fn load(&mut self, state: ProjectState) -> LoadReport {
        codec::load(self, state)
    }

    pub fn load_project_json(&mut self, json: &str) -> Result<LoadReport, FormatError> {
        let state = ProjectState::from_json(json)?;
        Ok(self.load(state))
    }

    pub fn load_project(&mut self, path: &Path) -> Result<LoadReport, FormatError> {
        let state = ProjectState::load_from_file(path)?;
        Ok(self.load(state))
    }

    pub fn capture(&self) -> ProjectState {
        codec::capture(self)
    }

    /// Capture the session under `filename`. The captured document becomes
    /// the active one.
    pub fn save_project(&mut self, filename: &str) -> ProjectState {
        let mut state = self.capture();
        state.filename = Some(filename.to_string());
        self.active = state.clone();
        state
    }

    /// Save to `<dir>/<name>.tmap` and return the written path.
    pub fn save_project_to(&mut self, dir: &Path, name: &str) -> Result<PathBuf, FormatError> {
        let state = self.save_project(name);
        let path = dir.join(ProjectState::file_name_for(name));
        state.save_to_file(&path)?;
        Ok(path)
    }

    // ---- settings ----

    /// Default toggles with their current values.
    pub fn setting_toggles(&self) -> Vec<(SettingDescriptor, bool)> {
        DEFAULT_TOGGLES
            .iter()
            .map(|d| (*d, self.settings.flag(d.module, d.function)))
            .collect()
    }

    /// Change a toggle and record it in the active document, replacing any
    /// earlier entry for the same setting.
    pub fn toggle_setting(&mut self, module: &str, function: &str, value: bool) -> ReplayOutcome {
        let entry = SettingEntry::new(module, function, value);
        let outcome = self.settings.apply(&mut self.viewer, &entry);
        let saved = self.active.settings.get_or_insert_with(Vec::new);
        saved.retain(|s| !s.is(module, function));
        saved.push(entry);
        log::debug!("Toggled {}.{} = {}", module, function, value);
        outcome
    }

    // ---- embedding bridge ----

    /// Add an image below `project_dir` as a layer. The tile source is the
    /// image's path relative to the project folder plus `.dzi`, the name is
    /// its file name. Returns the index of the new layer.
    ///
    /// Images on another root or above the project folder are rejected.
    pub fn add_layer(&mut self, project_dir: &Path, image: &Path) -> Result<usize, FormatError> {
        let image = project_dir.join(image);
        let outside = || FormatError::outside_root(image.to_string_lossy());

        if project_dir.components().next() != image.components().next() {
            return Err(outside());
        }
        let name = match image.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return Err(outside()),
        };
        let folder = image.parent().unwrap_or(project_dir);
        let relative = relative_prefix(project_dir, folder);
        if relative.split('/').any(|part| part == "..") {
            return Err(outside());
        }

        let tile_source = format!("{relative}/{name}.dzi");
        log::debug!("Adding layer {:?} from {:?}", name, tile_source);
        Ok(self.viewer.push_layer(Layer::new(name, tile_source)))
    }

    // ---- marker buttons ----

    /// Create a marker button from an open dataset tab. Returns the index of
    /// the new marker file, or `None` for an empty path.
    pub fn make_marker_button(
        &mut self,
        tab: &DatasetTab,
        path: FilePath,
        title: &str,
        comment: &str,
    ) -> Option<usize> {
        if path.is_empty() {
            log::warn!("Not creating a marker button without a path");
            return None;
        }

        let markers = self.active.marker_files.get_or_insert_with(Vec::new);
        let index = markers.len();
        let mut marker = MarkerFile::new(path)
            .with_title(title)
            .with_comment(comment);
        marker.hide_settings = Some(true);
        marker.auto_load = Some(false);
        marker.uid = Some(tab.uid.clone());
        marker.name = Some(tab.name.clone());
        marker.expected_header = Some(tab.header.clone());
        marker.expected_radios = Some(tab.radios.clone());
        marker.from_button = Some(index);

        self.viewer.chrome.marker_buttons.push(marker.button(index));
        markers.push(marker);
        log::info!("Created marker button {} for dataset {}", index, tab.uid);
        Some(index)
    }

    /// Rewrite the marker file a dataset was loaded from with the tab's
    /// current header and radio values.
    pub fn update_marker_button(&mut self, tab: &DatasetTab) -> Result<(), FormatError> {
        let index = tab
            .from_button
            .ok_or_else(|| FormatError::missing_field("fromButton"))?;
        let marker = self
            .active
            .marker_files
            .as_mut()
            .and_then(|markers| markers.get_mut(index))
            .ok_or_else(|| FormatError::invalid_format(format!("no marker file {index}")))?;
        marker.expected_header = Some(tab.header.clone());
        marker.expected_radios = Some(tab.radios.clone());
        log::debug!("Updated marker button {} from dataset {}", index, tab.uid);
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the built-in modules and their settings.
pub fn default_registry() -> SettingsRegistry<ViewerState> {
    let mut registry = SettingsRegistry::new();
    for toggle in DEFAULT_TOGGLES {
        registry.register_value(toggle.module, toggle.function, false);
    }
    registry.register_value("glUtils", "_markerScale2", 1.0);
    registry.register_module("regionUtils");

    registry.register_setter("projectUtils", "addLegend", |viewer: &mut ViewerState, value| {
        viewer.chrome.set_legend(&legend_content(value));
    });
    registry.register_setter(
        "filterUtils",
        "setCompositeOperation",
        |viewer: &mut ViewerState, value| {
            if let Some(mode) = value.as_str().filter(|m| !m.is_empty()) {
                viewer.filters.set_composite_mode(mode);
            }
            viewer.filters.apply_composite();
        },
    );
    registry
}

fn legend_content(value: &Value) -> String {
    match value {
        _ if !is_truthy(value) => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
