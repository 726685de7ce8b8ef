//! Project generation from an external list of layers.
//!
//! Image-analysis tools describe a scene as ordered layers: images, label
//! masks, point sets and shape sets. [`generate_project`] turns such a list
//! into a `.tmap` document and [`write_project`] lays out a project folder
//! with the document and the point and shape data.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Value, json};
use tmap_viewer::{ControlValue, FilterItem, Layer, Region, RegionPoint, RegionSet, Visibility};

use crate::format::{
    FormatError, LegacyCsv, MarkerFile, ProjectState, SettingEntry, to_json_indented,
};

/// Colors given to label masks, cycled in order.
pub const LABEL_COLORS: [[u8; 3]; 7] = [
    [100, 0, 0],
    [0, 100, 0],
    [0, 0, 100],
    [100, 100, 0],
    [0, 100, 100],
    [100, 0, 100],
    [100, 100, 100],
];

/// Filters every generated layer gets, before its `Color` filter.
const DEFAULT_FILTERS: [(&str, &str); 3] = [("Saturation", "0"), ("Brightness", "0"), ("Contrast", "1")];

/// Name of the project file inside a generated folder.
pub const MAIN_PROJECT: &str = "main.tmap";

fn default_opacity() -> f64 {
    1.0
}

fn default_visible() -> bool {
    true
}

/// One input layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceLayer {
    Image {
        name: String,
        #[serde(default = "default_opacity")]
        opacity: f64,
        #[serde(default = "default_visible")]
        visible: bool,
    },
    /// A label mask; every non-zero label becomes its own layer
    Labels {
        name: String,
        labels: Vec<u32>,
        #[serde(default = "default_opacity")]
        opacity: f64,
        #[serde(default = "default_visible")]
        visible: bool,
    },
    /// Points in `(row, column)` order
    Points {
        name: String,
        #[serde(default)]
        coordinates: Vec<[f64; 2]>,
        #[serde(default)]
        face_colors: Vec<Vec<f64>>,
    },
    /// Polygons in `(row, column)` order on a canvas of `(rows, columns)`
    Shapes {
        name: String,
        shapes: Vec<Vec<[f64; 2]>>,
        #[serde(default)]
        face_colors: Vec<Vec<f64>>,
        canvas: [f64; 2],
    },
}

/// Build the project document for `layers`.
pub fn generate_project(filename: &str, layers: &[SourceLayer]) -> ProjectState {
    let mut state = ProjectState::new();

    let markers: Vec<MarkerFile> = layers
        .iter()
        .filter_map(|layer| match layer {
            SourceLayer::Points { name, .. } => Some(points_marker(name)),
            _ => None,
        })
        .collect();

    let mut tiles = Vec::new();
    let mut layer_filters = std::collections::BTreeMap::new();
    let mut opacities = std::collections::BTreeMap::new();
    let mut visibilities = std::collections::BTreeMap::new();
    let mut regions = RegionSet::new();
    let mut used_colors = 0;

    for layer in layers {
        match layer {
            SourceLayer::Image {
                name,
                opacity,
                visible,
            } => {
                let index = tiles.len();
                tiles.push(Layer::new(name, format!("images/{name}.tif.dzi")));
                layer_filters.insert(index, layer_filter_items("0"));
                opacities.insert(index, ControlValue::Text(python_float(*opacity)));
                visibilities.insert(index, Visibility::Text(python_bool(*visible).into()));
            }
            SourceLayer::Labels {
                name,
                labels,
                opacity,
                visible,
            } => {
                let mut unique = labels.clone();
                unique.sort_unstable();
                unique.dedup();
                for (j, label) in unique.iter().enumerate() {
                    if *label == 0 {
                        continue;
                    }
                    let index = tiles.len();
                    tiles.push(Layer::new(
                        format!("{name} ({label})"),
                        format!("labels/{name}_{j:02}.tif.dzi"),
                    ));
                    let [r, g, b] = LABEL_COLORS[used_colors % LABEL_COLORS.len()];
                    layer_filters.insert(index, layer_filter_items(&format!("{r},{g},{b}")));
                    opacities.insert(index, ControlValue::Text(python_float(*opacity)));
                    visibilities.insert(index, Visibility::Text(python_bool(*visible).into()));
                    used_colors += 1;
                }
            }
            SourceLayer::Shapes {
                name,
                shapes,
                face_colors,
                canvas,
            } => {
                regions.extend(shape_regions(name, shapes, face_colors, *canvas));
            }
            SourceLayer::Points { .. } => {}
        }
    }

    state.composite_mode = Some("lighter".to_string());
    state.filename = Some(filename.to_string());
    state.layers = Some(tiles);
    state.filters = Some(
        ["Saturation", "Brightness", "Contrast", "Color"]
            .map(String::from)
            .to_vec(),
    );
    state.layer_filters = Some(layer_filters);
    state.layer_opacities = Some(opacities);
    state.layer_visibilities = Some(visibilities);
    state.marker_files = Some(markers);
    state.regions = Some(regions);
    state.settings = Some(vec![
        SettingEntry::new("overlayUtils", "_linkMarkersToChannels", true),
        SettingEntry::new("dataUtils", "_autoLoadCSV", true),
        SettingEntry::new("glUtils", "_markerScale2", 7.5),
    ]);

    log::info!(
        "Generated project {:?} with {} layers, {} marker files, {} regions",
        filename,
        state.layer_count(),
        state.marker_files.as_ref().map_or(0, Vec::len),
        state.regions.as_ref().map_or(0, |r| r.len())
    );
    state
}

fn layer_filter_items(color: &str) -> Vec<FilterItem> {
    DEFAULT_FILTERS
        .iter()
        .map(|(name, value)| FilterItem::new(*name, *value))
        .chain(std::iter::once(FilterItem::new("Color", color)))
        .collect()
}

fn points_marker(name: &str) -> MarkerFile {
    let mut marker = MarkerFile::new(format!("points/{name}.csv").as_str())
        .with_title(format!("Download markers ({name})"))
        .with_comment(name);
    marker.auto_load = Some(true);
    marker.expected_csv = Some(LegacyCsv {
        x_col: Some("x".into()),
        y_col: Some("y".into()),
        key: Some("letters".into()),
        group: Some("name".into()),
        name: Some(String::new()),
        color: Some("color".into()),
        ..Default::default()
    });
    marker
}

/// Regions for a set of polygons, named `<name>_1`, `<name>_2`, ...
///
/// `points` are normalized by the canvas size, `globalPoints` are in pixels.
pub fn shape_regions(
    name: &str,
    shapes: &[Vec<[f64; 2]>],
    face_colors: &[Vec<f64>],
    canvas: [f64; 2],
) -> RegionSet {
    let [rows, columns] = canvas;
    let mut regions = RegionSet::new();

    for (i, shape) in shapes.iter().enumerate() {
        let id = format!("{name}_{}", i + 1);
        let mut region = Region::new(&id);

        let normalized: Vec<RegionPoint> = shape
            .iter()
            .map(|[row, column]| RegionPoint::new(column / columns, row / rows))
            .collect();
        let global: Vec<RegionPoint> = shape
            .iter()
            .map(|[row, column]| RegionPoint::new(*column, *row))
            .collect();
        region.points = vec![vec![normalized]];
        region.global_points = vec![vec![global]];

        match face_colors.get(i) {
            Some(color) => region.polycolor = rgb_to_hex(color),
            None => log::warn!("Shape {} has no face color, using {}", id, region.polycolor),
        }

        let (xmin, xmax, ymin, ymax) = region.bounds().unwrap_or(EMPTY_BOUNDS);
        let (gxmin, gxmax, gymin, gymax) = region.global_bounds().unwrap_or(EMPTY_BOUNDS);
        let extra = json!({
            "barcodeHistogram": [],
            "len": 1,
            "_xmin": xmin, "_xmax": xmax, "_ymin": ymin, "_ymax": ymax,
            "_gxmin": gxmin, "_gxmax": gxmax, "_gymin": gymin, "_gymax": gymax,
            "associatedPoints": [],
        });
        if let Value::Object(extra) = extra {
            region.extra = extra;
        }
        regions.insert(id, region);
    }
    regions
}

const EMPTY_BOUNDS: (f64, f64, f64, f64) =
    (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);

/// `#RRGGBB` for color components in `[0, 1]`; extra components are ignored.
///
/// Each component is written as two uppercase hex digits padded with zeros,
/// so `[0.02, 1.0, 0.5]` gives `#05FF7F`. Older napari exports padded with
/// spaces instead (`# 5FF7F`); those colors are not reproduced.
pub fn rgb_to_hex(color: &[f64]) -> String {
    color.iter().take(3).fold(String::from("#"), |mut hex, c| {
        hex.push_str(&format!("{:02X}", (c * 255.0).clamp(0.0, 255.0) as u8));
        hex
    })
}

/// Decimal form with at least one fractional digit, e.g. `1.0` or `0.5`.
fn python_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Files written by [`write_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub project: PathBuf,
    pub points: Vec<PathBuf>,
    pub shapes: Vec<PathBuf>,
    /// Image and label layers whose pixels must be written by the caller
    pub skipped: Vec<String>,
}

/// Create the project folder `folder` (which must end in `.tmap`) with
/// `main.tmap`, one CSV per point layer and one JSON per shape layer.
pub fn write_project(folder: &Path, layers: &[SourceLayer]) -> Result<WriteReport, FormatError> {
    let is_tmap = folder
        .extension()
        .is_some_and(|ext| ext == ProjectState::TMAP_EXTENSION);
    if !is_tmap {
        return Err(FormatError::invalid_format(format!(
            "{} is not a .tmap folder",
            folder.display()
        )));
    }
    let stem = folder
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    std::fs::create_dir_all(folder)?;
    let state = generate_project(&stem, layers);
    let project = folder.join(MAIN_PROJECT);
    state.save_to_file(&project)?;

    let mut report = WriteReport {
        project,
        ..Default::default()
    };

    for layer in layers {
        match layer {
            SourceLayer::Points {
                name,
                coordinates,
                face_colors,
            } => {
                let dir = folder.join("points");
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{name}.csv"));
                std::fs::write(&path, points_csv(name, coordinates, face_colors))?;
                report.points.push(path);
            }
            SourceLayer::Shapes {
                name,
                shapes,
                face_colors,
                canvas,
            } => {
                let dir = folder.join("shapes");
                std::fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{name}.json"));
                let regions = shape_regions(name, shapes, face_colors, *canvas);
                std::fs::write(&path, to_json_indented(&regions)?)?;
                report.shapes.push(path);
            }
            SourceLayer::Image { name, .. } | SourceLayer::Labels { name, .. } => {
                log::warn!("Layer {:?} has pixel data, not written here", name);
                report.skipped.push(name.clone());
            }
        }
    }
    Ok(report)
}

/// `name,x,y,color` rows; input points are `(row, column)`.
fn points_csv(name: &str, coordinates: &[[f64; 2]], face_colors: &[Vec<f64>]) -> String {
    let mut csv = String::from("name,x,y,color\n");
    for (i, [row, column]) in coordinates.iter().enumerate() {
        let color = face_colors
            .get(i)
            .map(|c| rgb_to_hex(c))
            .unwrap_or_default();
        csv.push_str(&format!(
            "{name},{},{},{color}\n",
            python_float(*column),
            python_float(*row)
        ));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Vec<SourceLayer> {
        serde_json::from_str(
            r#"[
                {"type": "image", "name": "dapi", "opacity": 0.5},
                {"type": "labels", "name": "cells", "labels": [0, 3, 3, 7], "visible": false},
                {"type": "points", "name": "genes", "coordinates": [[10, 20]], "face_colors": [[1, 0, 0, 1]]},
                {"type": "shapes", "name": "roi", "shapes": [[[0, 0], [50, 100], [100, 0]]],
                 "face_colors": [[0, 0.5, 1]], "canvas": [100, 200]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_layers_and_controls() {
        let state = generate_project("scene", &scene());
        let layers = state.layers.as_ref().unwrap();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].tile_source, "images/dapi.tif.dzi");
        assert_eq!(layers[1].name, "cells (3)");
        assert_eq!(layers[1].tile_source, "labels/cells_01.tif.dzi");
        assert_eq!(layers[2].tile_source, "labels/cells_02.tif.dzi");

        let opacities = state.layer_opacities.as_ref().unwrap();
        assert_eq!(opacities[&0], ControlValue::from("0.5"));
        assert_eq!(opacities[&1], ControlValue::from("1.0"));
        let visibilities = state.layer_visibilities.as_ref().unwrap();
        assert_eq!(visibilities[&0], Visibility::Text("True".into()));
        assert_eq!(visibilities[&2], Visibility::Text("False".into()));
    }

    #[test]
    fn test_filters_cycle_label_colors() {
        let state = generate_project("scene", &scene());
        let filters = state.layer_filters.as_ref().unwrap();
        assert_eq!(filters[&0].len(), 4);
        assert_eq!(filters[&0][3], FilterItem::new("Color", "0"));
        assert_eq!(filters[&1][3], FilterItem::new("Color", "100,0,0"));
        assert_eq!(filters[&2][3], FilterItem::new("Color", "0,100,0"));
        assert_eq!(filters[&2][2], FilterItem::new("Contrast", "1"));
    }

    #[test]
    fn test_points_become_legacy_markers() {
        let state = generate_project("scene", &scene());
        let marker = &state.marker_files.as_ref().unwrap()[0];
        assert_eq!(marker.title.as_deref(), Some("Download markers (genes)"));
        assert_eq!(marker.comment.as_deref(), Some("genes"));
        assert_eq!(marker.auto_load, Some(true));
        let csv = marker.expected_csv.as_ref().unwrap();
        assert_eq!(csv.key.as_deref(), Some("letters"));
        assert_eq!(csv.group.as_deref(), Some("name"));
    }

    #[test]
    fn test_project_settings() {
        let state = generate_project("scene", &scene());
        assert_eq!(state.composite_mode.as_deref(), Some("lighter"));
        assert_eq!(state.filters.as_ref().unwrap().len(), 4);
        let settings = state.settings.as_ref().unwrap();
        assert!(settings[2].is("glUtils", "_markerScale2"));
        assert_eq!(settings[2].value, json!(7.5));
    }

    #[test]
    fn test_shape_regions() {
        let state = generate_project("scene", &scene());
        let regions = state.regions.as_ref().unwrap();
        let region = &regions["roi_1"];
        assert_eq!(region.region_name, "roi_1");
        assert_eq!(region.polycolor, "#007FFF");
        assert_eq!(region.global_points[0][0][1], RegionPoint::new(100.0, 50.0));
        assert_eq!(region.points[0][0][1], RegionPoint::new(0.5, 0.5));
        assert_eq!(region.extra["_gxmax"], json!(100.0));
        assert_eq!(region.extra["_ymax"], json!(1.0));
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex(&[1.0, 0.0, 0.0, 1.0]), "#FF0000");
        assert_eq!(rgb_to_hex(&[0.02, 1.0, 0.5]), "#05FF7F");
    }

    #[test]
    fn test_generated_project_loads() {
        let state = generate_project("scene", &scene());
        let mut session = crate::session::Session::new();
        let report = session.load(state);
        session.viewer_mut().finish_layout();

        assert_eq!(report.legacy_upgraded, 1);
        assert!(session.viewer().control(0).unwrap().visible);
        // "False" is not zero
        assert!(session.viewer().control(2).unwrap().visible);
        assert!(session.settings().flag("overlayUtils", "_linkMarkersToChannels"));
    }

    #[test]
    fn test_write_project() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("scene.tmap");
        let report = write_project(&folder, &scene()).unwrap();

        assert_eq!(report.skipped, vec!["dapi".to_string(), "cells".to_string()]);
        let csv = std::fs::read_to_string(&report.points[0]).unwrap();
        assert_eq!(csv, "name,x,y,color\ngenes,20.0,10.0,#FF0000\n");
        assert!(report.shapes[0].ends_with("shapes/roi.json"));

        let state = ProjectState::load_from_file(&folder.join(MAIN_PROJECT)).unwrap();
        assert_eq!(state.filename.as_deref(), Some("scene"));

        assert!(write_project(&dir.path().join("plain"), &scene()).is_err());
    }
}
