//! Upgrade of the legacy `expectedCSV` marker-file description.
//!
//! Old projects describe a marker dataset with an `expectedCSV` block (column
//! names plus a `key` discriminator) and a list of global marker settings.
//! Current projects use `expectedHeader` (dropdown values) and
//! `expectedRadios` (option checkboxes). The translation is one-way and lossy;
//! it has to stay exactly as is for old project files to keep loading.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tmap_viewer::lenient;

use crate::format::marker::{ExpectedHeader, ExpectedRadios, MarkerFile};
use crate::format::settings::is_truthy;

/// Marker symbol names, indexed by the legacy shape number.
pub const SYMBOL_NAMES: [&str; 14] = [
    "cross",
    "diamond",
    "square",
    "triangle up",
    "star",
    "clobber",
    "disc",
    "hbar",
    "vbar",
    "tailed arrow",
    "triangle down",
    "ring",
    "x",
    "arrow",
];

/// Shape number remapping applied before the symbol lookup.
const SYMBOL_REMAP: &[(usize, usize)] = &[(6, 6)];

/// Symbol used when random shapes are turned off without a fixed shape.
const FALLBACK_SYMBOL: usize = 2;

/// Settings that switch the color-by-group mode to a color dictionary.
const COLOR_DICT_SETTINGS: [(&str, &str); 3] = [
    ("markerUtils", "_colorsperkey"),
    ("HTMLElementUtils", "_colorsperiter"),
    ("HTMLElementUtils", "_colorsperbarcode"),
];

/// Legacy column description of a marker dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyCsv {
    #[serde(
        rename = "X_col",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub x_col: Option<String>,
    #[serde(
        rename = "Y_col",
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub y_col: Option<String>,
    /// `"letters"` when `group` holds the gene letters column
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub key: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub group: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub piechart: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub scale: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Translate `expectedCSV` into `expectedHeader`/`expectedRadios` in place.
///
/// Returns false (and changes nothing) when the marker file has no legacy
/// block.
pub fn upgrade_marker_file(marker: &mut MarkerFile) -> bool {
    let Some(csv) = marker.expected_csv.take() else {
        return false;
    };
    log::debug!(
        "Upgrading legacy marker file {:?}",
        marker.title.as_deref().unwrap_or_default()
    );

    let header = marker.expected_header.get_or_insert_with(ExpectedHeader::new);
    header.set_opt("X", csv.x_col.as_deref());
    header.set_opt("Y", csv.y_col.as_deref());
    let (gb_col, gb_name) = if csv.key.as_deref() == Some("letters") {
        (&csv.group, &csv.name)
    } else {
        (&csv.name, &csv.group)
    };
    header.set_opt("gb_col", gb_col.as_deref());
    header.set_opt("gb_name", gb_name.as_deref());

    let radios = marker.expected_radios.get_or_insert_with(ExpectedRadios::new);
    match non_empty(&csv.piechart) {
        Some(column) => {
            radios.set("pie_check", true);
            header.set("pie_col", column);
        }
        None => radios.set("pie_check", false),
    }
    match non_empty(&csv.color) {
        Some(column) => {
            radios.set("cb_gr", false);
            radios.set("cb_col", true);
            header.set("cb_col", column);
        }
        None => radios.set("cb_col", false),
    }
    match non_empty(&csv.scale) {
        Some(column) => {
            radios.set("scale_check", true);
            header.set("scale_col", column);
        }
        None => radios.set("scale_check", false),
    }

    if marker.uid.is_none() {
        marker.uid = Some("uniquetab".to_string());
    }
    marker.name = Some(
        marker
            .title
            .as_deref()
            .unwrap_or_default()
            .replacen("Download", "", 1),
    );

    if let Some(settings) = marker.settings.as_mut() {
        radios.set("cb_gr", true);
        radios.set("cb_gr_dict", false);
        radios.set("cb_gr_rand", false);
        radios.set("cb_gr_key", true);

        for setting in settings.iter_mut() {
            if setting.is("markerUtils", "_selectedShape") {
                let index = symbol_index(&setting.value).map(|i| match remap_symbol(i) {
                    Some(mapped) => {
                        setting.value = Value::from(mapped);
                        mapped
                    }
                    None => i,
                });
                header.set_opt("shape_fixed", index.and_then(|i| SYMBOL_NAMES.get(i).copied()));
            }
            if setting.is("markerUtils", "_randomShape") {
                radios.set("shape_fixed", !is_truthy(&setting.value));
                if !header.is_set("shape_fixed") {
                    header.set("shape_fixed", SYMBOL_NAMES[FALLBACK_SYMBOL]);
                }
            }
            if COLOR_DICT_SETTINGS
                .iter()
                .any(|(module, function)| setting.is(module, function))
            {
                radios.set("cb_gr", true);
                radios.set("cb_gr_rand", false);
                radios.set("cb_gr_key", false);
                radios.set("cb_gr_dict", true);
                let dict = match &setting.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                header.set("cb_gr_dict", dict);
            }
            if setting.is("glUtils", "_markerOpacity") {
                header.set("opacity", setting.value.clone());
                setting.function = "_markerOpacityOld".to_string();
            }
        }
    }

    marker.hide_settings = Some(true);
    true
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Shape number held by a setting value (number or numeric string).
fn symbol_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|i| i as usize).or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as usize)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn remap_symbol(index: usize) -> Option<usize> {
    SYMBOL_REMAP
        .iter()
        .find(|(from, _)| *from == index)
        .map(|(_, to)| *to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_index_forms() {
        assert_eq!(symbol_index(&Value::from(3)), Some(3));
        assert_eq!(symbol_index(&Value::from(4.0)), Some(4));
        assert_eq!(symbol_index(&Value::from("5")), Some(5));
        assert_eq!(symbol_index(&Value::from("disc")), None);
        assert_eq!(symbol_index(&Value::Null), None);
    }

    #[test]
    fn test_remap_table() {
        assert_eq!(remap_symbol(6), Some(6));
        assert_eq!(remap_symbol(3), None);
    }

    #[test]
    fn test_no_legacy_block_is_noop() {
        let mut marker = MarkerFile::new("a.csv");
        let before = marker.clone();
        assert!(!upgrade_marker_file(&mut marker));
        assert_eq!(marker, before);
    }
}
