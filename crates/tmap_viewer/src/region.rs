//! Polygon regions drawn over the slide.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Regions keyed by region id.
pub type RegionSet = BTreeMap<String, Region>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionPoint {
    pub x: f64,
    pub y: f64,
}

impl RegionPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A region polygon.
///
/// Points are nested as polygons → rings → vertices. `points` are normalized
/// to the image width, `global_points` are in pixels. Fields this model does
/// not interpret (bounds caches, histograms) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default)]
    pub points: Vec<Vec<Vec<RegionPoint>>>,
    #[serde(rename = "globalPoints", default)]
    pub global_points: Vec<Vec<Vec<RegionPoint>>>,
    #[serde(rename = "regionName", default, deserialize_with = "lenient::text")]
    pub region_name: String,
    #[serde(rename = "regionClass", default, deserialize_with = "lenient::opt_text")]
    pub region_class: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub polycolor: String,
    #[serde(default, deserialize_with = "lenient::truthy")]
    pub filled: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Region {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            region_name: id.clone(),
            id,
            points: Vec::new(),
            global_points: Vec::new(),
            region_class: None,
            polycolor: "#ff0000".to_string(),
            filled: true,
            extra: serde_json::Map::new(),
        }
    }

    /// Bounding box `(xmin, xmax, ymin, ymax)` of the global points.
    pub fn global_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of(&self.global_points)
    }

    /// Bounding box `(xmin, xmax, ymin, ymax)` of the normalized points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of(&self.points)
    }
}

fn bounds_of(polygons: &[Vec<Vec<RegionPoint>>]) -> Option<(f64, f64, f64, f64)> {
    polygons
        .iter()
        .flatten()
        .flatten()
        .fold(None, |acc, p| match acc {
            None => Some((p.x, p.x, p.y, p.y)),
            Some((xmin, xmax, ymin, ymax)) => {
                Some((xmin.min(p.x), xmax.max(p.x), ymin.min(p.y), ymax.max(p.y)))
            }
        })
}
