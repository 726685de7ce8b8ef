//! Marker and region dataset descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tmap_viewer::{DownloadButton, lenient};

use crate::format::legacy::LegacyCsv;
use crate::format::settings::{SettingEntry, is_truthy};

/// A dataset path: one file, or a list of files offered in a dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilePath {
    Single(String),
    Many(Vec<String>),
}

impl FilePath {
    /// Parse a path typed by the user; input containing `[` is read as a
    /// JSON list when it parses as one.
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        if input.contains('[') {
            if let Ok(paths) = serde_json::from_str::<Vec<String>>(input) {
                return FilePath::Many(paths);
            }
        }
        FilePath::Single(input.to_string())
    }

    pub fn is_many(&self) -> bool {
        matches!(self, FilePath::Many(_))
    }

    pub fn paths(&self) -> Vec<&str> {
        match self {
            FilePath::Single(p) => vec![p.as_str()],
            FilePath::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }

    /// Rewrite every path in place.
    pub fn map_in_place(&mut self, mut f: impl FnMut(&str) -> String) {
        match self {
            FilePath::Single(p) => *p = f(p),
            FilePath::Many(ps) => {
                for p in ps.iter_mut() {
                    *p = f(p);
                }
            }
        }
    }

    /// Whether no file is referenced at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FilePath::Single(p) => p.is_empty(),
            FilePath::Many(ps) => ps.is_empty(),
        }
    }
}

impl From<&str> for FilePath {
    fn from(path: &str) -> Self {
        FilePath::Single(path.to_string())
    }
}

impl From<Vec<String>> for FilePath {
    fn from(paths: Vec<String>) -> Self {
        FilePath::Many(paths)
    }
}

/// Column mapping of a marker dataset (dropdown id → column or option value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedHeader(BTreeMap<String, Value>);

impl ExpectedHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Set `key` to `value`, or remove it when `value` is `None`.
    pub fn set_opt(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => self.set(key, v),
            None => {
                self.0.remove(key);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether `key` holds a truthy value.
    pub fn is_set(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ExpectedHeader {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Radio buttons and checkboxes of a marker dataset tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedRadios(BTreeMap<String, bool>);

impl ExpectedRadios {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    pub fn set(&mut self, key: impl Into<String>, checked: bool) {
        self.0.insert(key.into(), checked);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for ExpectedRadios {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A marker dataset offered as a button in the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerFile {
    pub path: FilePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Name of the dataset tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub hide_settings: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_load: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_header: Option<ExpectedHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_radios: Option<ExpectedRadios>,
    /// Legacy column description, replaced on load
    #[serde(
        rename = "expectedCSV",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_csv: Option<LegacyCsv>,
    /// Legacy per-dataset settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<SettingEntry>>,
    /// Index of the button this descriptor was loaded into
    #[serde(
        default,
        deserialize_with = "lenient::opt_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub from_button: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkerFile {
    pub fn new(path: impl Into<FilePath>) -> Self {
        Self {
            path: path.into(),
            title: None,
            comment: None,
            name: None,
            uid: None,
            hide_settings: None,
            auto_load: None,
            expected_header: None,
            expected_radios: None,
            expected_csv: None,
            settings: None,
            from_button: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_legacy(&self) -> bool {
        self.expected_csv.is_some()
    }

    /// Button presenting this dataset at position `index`.
    pub fn button(&self, index: usize) -> DownloadButton {
        dataset_button(index, &self.path, &self.title, &self.comment)
    }
}

/// A region dataset offered as a button in the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFile {
    pub path: FilePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegionFile {
    pub fn new(path: impl Into<FilePath>) -> Self {
        Self {
            path: path.into(),
            title: None,
            comment: None,
            extra: Map::new(),
        }
    }

    pub fn button(&self, index: usize) -> DownloadButton {
        dataset_button(index, &self.path, &self.title, &self.comment)
    }
}

fn dataset_button(
    index: usize,
    path: &FilePath,
    title: &Option<String>,
    comment: &Option<String>,
) -> DownloadButton {
    let paths = path.paths().into_iter().map(str::to_string).collect();
    DownloadButton::new(index, paths, path.is_many())
        .with_title(title.clone().unwrap_or_default())
        .with_comment(comment.clone().unwrap_or_default())
}

/// A custom menu entry opening a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuButton {
    pub text: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmap_viewer::ButtonKind;

    #[test]
    fn test_path_forms() {
        let single: FilePath = serde_json::from_str(r#""data/a.csv""#).unwrap();
        assert!(!single.is_many());
        assert_eq!(single.paths(), vec!["data/a.csv"]);

        let many: FilePath = serde_json::from_str(r#"["a.csv", "b.csv"]"#).unwrap();
        assert!(many.is_many());
        assert_eq!(many.paths().len(), 2);
    }

    #[test]
    fn test_path_from_input() {
        assert_eq!(FilePath::from_input(" a.csv "), FilePath::from("a.csv"));
        assert_eq!(
            FilePath::from_input(r#"["a.csv","b.csv"]"#),
            FilePath::Many(vec!["a.csv".into(), "b.csv".into()])
        );
        assert_eq!(FilePath::from_input("odd[1].csv"), FilePath::from("odd[1].csv"));
    }

    #[test]
    fn test_array_path_makes_dropdown_button() {
        let marker = MarkerFile::new(vec!["a.csv".to_string(), "b.csv".to_string()])
            .with_title("Download");
        let button = marker.button(3);
        assert_eq!(button.kind, ButtonKind::Dropdown);
        assert_eq!(button.index, 3);
        assert_eq!(button.title, "Download");

        let marker = MarkerFile::new("a.csv");
        assert_eq!(marker.button(0).kind, ButtonKind::Single);
    }

    #[test]
    fn test_marker_file_keeps_unknown_fields() {
        let json = r#"{
            "path": "genes.csv",
            "title": "Genes",
            "expectedHeader": {"X": "x", "Y": "y"},
            "expectedRadios": {"cb_col": false},
            "fromButton": 0,
            "customField": [1, 2]
        }"#;
        let marker: MarkerFile = serde_json::from_str(json).unwrap();
        assert_eq!(marker.expected_header.as_ref().unwrap().get_str("X"), Some("x"));
        assert_eq!(marker.expected_radios.as_ref().unwrap().get("cb_col"), Some(false));
        assert_eq!(marker.from_button, Some(0));

        let back = serde_json::to_value(&marker).unwrap();
        assert_eq!(back["customField"], serde_json::json!([1, 2]));
        assert!(back.get("expectedCSV").is_none());
    }

    #[test]
    fn test_header_set_opt_removes() {
        let mut header: ExpectedHeader = [("X", "x")].into_iter().collect();
        header.set_opt("X", None);
        assert!(header.get("X").is_none());
        header.set_opt("Y", Some("y"));
        assert!(header.is_set("Y"));
    }
}
