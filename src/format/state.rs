//! The `.tmap` project document.
//!
//! A project file is a single JSON object describing a complete viewing
//! session. Every field is optional: loading skips what is absent, and fields
//! this crate does not know about are carried through `extra` so that a
//! load → save cycle does not drop them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tmap_viewer::{ControlValue, FilterItem, Layer, Rect, RegionSet, Visibility, lenient};

use crate::format::error::FormatError;
use crate::format::marker::{MarkerFile, MenuButton, RegionFile};
use crate::format::settings::SettingEntry;

/// Complete project state as stored in a `.tmap` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    /// Slide file name, also used as the project title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// External link attached to the project title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_files: Option<Vec<MarkerFile>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_files: Option<Vec<RegionFile>>,

    /// Single region file, resolved against the project's base path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<RegionSet>,

    /// Names of the enabled filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,

    #[serde(default, with = "index_keys", skip_serializing_if = "Option::is_none")]
    pub layer_filters: Option<BTreeMap<usize, Vec<FilterItem>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_mode: Option<String>,

    #[serde(default, with = "index_keys", skip_serializing_if = "Option::is_none")]
    pub layer_opacities: Option<BTreeMap<usize, ControlValue>>,

    #[serde(default, with = "index_keys", skip_serializing_if = "Option::is_none")]
    pub layer_visibilities: Option<BTreeMap<usize, Visibility>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<SettingEntry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_buttons: Option<Vec<MenuButton>>,

    #[serde(
        default,
        deserialize_with = "lenient::opt_truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub hide_tabs: Option<bool>,

    /// Server-side plugins to enable with the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,

    /// Viewport rotation in degrees
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rotate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,

    /// Fields without a typed counterpart
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectState {
    /// Extension of project files, without the dot.
    pub const TMAP_EXTENSION: &'static str = "tmap";

    /// Create an empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a project document.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize with 4-space indentation.
    pub fn to_json(&self) -> Result<String, FormatError> {
        to_json_indented(self)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, FormatError> {
        if !path.is_file() {
            return Err(FormatError::not_found(path));
        }
        let json = std::fs::read_to_string(path)?;
        let state = Self::from_json(&json)?;
        log::info!("Loaded project from {:?}", path);
        Ok(state)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), FormatError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved project to {:?}", path);
        Ok(())
    }

    /// Project file name for a user-chosen name, appending `.tmap` when
    /// missing.
    pub fn file_name_for(name: &str) -> String {
        let suffix = format!(".{}", Self::TMAP_EXTENSION);
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        }
    }

    /// Number of layers, zero when the field is absent.
    pub fn layer_count(&self) -> usize {
        self.layers.as_ref().map_or(0, Vec::len)
    }

    /// Whether any marker file still uses the legacy column description.
    pub fn has_legacy_markers(&self) -> bool {
        self.marker_files
            .iter()
            .flatten()
            .any(MarkerFile::is_legacy)
    }
}

/// Layer-index keyed maps.
///
/// JSON object keys are strings. Flattened structs buffer their fields, which
/// loses serde_json's numeric key parsing, so keys are parsed here.
mod index_keys {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(map: &Option<BTreeMap<usize, T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        map.serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<BTreeMap<usize, T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let Some(raw) = Option::<BTreeMap<String, T>>::deserialize(deserializer)? else {
            return Ok(None);
        };
        raw.into_iter()
            .map(|(key, value)| {
                key.trim()
                    .parse::<usize>()
                    .map(|index| (index, value))
                    .map_err(|_| D::Error::custom(format!("invalid layer index {key:?}")))
            })
            .collect::<Result<_, _>>()
            .map(Some)
    }
}

/// Serialize any value as JSON indented with four spaces.
pub(crate) fn to_json_indented<T: Serialize + ?Sized>(value: &T) -> Result<String, FormatError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| FormatError::invalid_format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_parses() {
        let state = ProjectState::from_json("{}").unwrap();
        assert_eq!(state, ProjectState::new());
        assert_eq!(state.layer_count(), 0);
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        let err = ProjectState::from_json("{\"layers\": [").unwrap_err();
        assert!(matches!(err, FormatError::Json(_)));
    }

    #[test]
    fn test_index_keyed_maps() {
        let json = r#"{
            "layers": [{"name": "a", "tileSource": "a.dzi"}, {"name": "b", "tileSource": "b.dzi"}],
            "layerOpacities": {"0": "0.5", "1": 1},
            "layerVisibilities": {"0": true, "1": "True"}
        }"#;
        let state = ProjectState::from_json(json).unwrap();
        let opacities = state.layer_opacities.as_ref().unwrap();
        assert_eq!(opacities[&0], ControlValue::Text("0.5".into()));
        assert_eq!(opacities[&1].as_f64(), Some(1.0));
        let visibilities = state.layer_visibilities.as_ref().unwrap();
        assert!(visibilities[&1].is_visible());
    }

    #[test]
    fn test_four_space_indent_and_skipped_fields() {
        let mut state = ProjectState::new();
        state.filename = Some("slide.tif".into());
        let json = state.to_json().unwrap();
        assert_eq!(json, "{\n    \"filename\": \"slide.tif\"\n}");
    }

    #[test]
    fn test_unknown_fields_survive() {
        let json = r#"{"filename": "x", "schemaVersion": "1.3", "mpp": 0.25}"#;
        let state = ProjectState::from_json(json).unwrap();
        let back: Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(back["schemaVersion"], "1.3");
        assert_eq!(back["mpp"], 0.25);
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(ProjectState::file_name_for("project"), "project.tmap");
        assert_eq!(ProjectState::file_name_for("project.tmap"), "project.tmap");
    }
}
