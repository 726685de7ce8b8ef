//! Image layers and their per-layer display controls.

use serde::{Deserialize, Serialize};

/// One tiled image source with a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Name shown in the layer panel
    pub name: String,
    /// Path or URL of the tile source descriptor (usually a `.dzi`)
    #[serde(rename = "tileSource")]
    pub tile_source: String,
}

impl Layer {
    /// Create a new layer.
    pub fn new(name: impl Into<String>, tile_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tile_source: tile_source.into(),
        }
    }
}

/// Value held by a slider-like control.
///
/// Project files store whatever the control held at save time, so numbers and
/// numeric strings both occur in the wild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Number(f64),
    Text(String),
}

impl ControlValue {
    /// Numeric reading of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ControlValue::Number(n) => Some(*n),
            ControlValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for ControlValue {
    fn default() -> Self {
        ControlValue::Number(1.0)
    }
}

impl From<f64> for ControlValue {
    fn from(value: f64) -> Self {
        ControlValue::Number(value)
    }
}

impl From<&str> for ControlValue {
    fn from(value: &str) -> Self {
        ControlValue::Text(value.to_string())
    }
}

impl From<String> for ControlValue {
    fn from(value: String) -> Self {
        ControlValue::Text(value)
    }
}

/// Visibility entry as stored in a project file.
///
/// Saved projects hold booleans, but generated ones hold strings such as
/// `"True"`. Visibility is decided by a loose comparison against zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Visibility {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl Visibility {
    /// Whether the layer should be shown.
    ///
    /// `false`, `0`, empty and zero-valued strings are hidden; everything
    /// else, including non-numeric text like `"False"`, is visible.
    pub fn is_visible(&self) -> bool {
        match self {
            Visibility::Flag(b) => *b,
            Visibility::Number(n) => *n != 0.0,
            Visibility::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return false;
                }
                match trimmed.parse::<f64>() {
                    Ok(n) => n != 0.0,
                    Err(_) => true,
                }
            }
        }
    }
}

impl From<bool> for Visibility {
    fn from(value: bool) -> Self {
        Visibility::Flag(value)
    }
}

/// Opacity slider and visibility checkbox of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerControl {
    pub opacity: ControlValue,
    pub visible: bool,
}

impl Default for LayerControl {
    fn default() -> Self {
        Self {
            opacity: ControlValue::default(),
            visible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_serializes_tile_source_in_camel_case() {
        let layer = Layer::new("DAPI", "images/dapi.tif.dzi");
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["tileSource"], "images/dapi.tif.dzi");
        assert_eq!(json["name"], "DAPI");
    }

    #[test]
    fn test_control_value_accepts_numbers_and_strings() {
        let values: Vec<ControlValue> = serde_json::from_str(r#"[0.5, "0.25", 1]"#).unwrap();
        assert_eq!(values[0], ControlValue::Number(0.5));
        assert_eq!(values[1], ControlValue::Text("0.25".into()));
        assert_eq!(values[1].as_f64(), Some(0.25));
        assert_eq!(values[2].as_f64(), Some(1.0));
    }

    #[test]
    fn test_visibility_loose_comparison() {
        assert!(Visibility::Flag(true).is_visible());
        assert!(!Visibility::Flag(false).is_visible());
        assert!(!Visibility::Number(0.0).is_visible());
        assert!(Visibility::Number(2.0).is_visible());
        assert!(!Visibility::Text("0".into()).is_visible());
        assert!(!Visibility::Text("".into()).is_visible());
        assert!(Visibility::Text("1".into()).is_visible());
        assert!(Visibility::Text("True".into()).is_visible());
        // Non-numeric text never compares equal to zero
        assert!(Visibility::Text("False".into()).is_visible());
    }

    #[test]
    fn test_default_control() {
        let control = LayerControl::default();
        assert!(control.visible);
        assert_eq!(control.opacity.as_f64(), Some(1.0));
    }
}
