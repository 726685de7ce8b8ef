//! tmap_viewer - headless model of a tiled whole-slide viewer
//!
//! This crate holds everything a project file can touch on the viewer side:
//! the layer list and per-layer controls, the viewport, image filters, the
//! region overlay and the project chrome (title, buttons, menu, legend).
//! Hosts drive the model directly and report layout completion through
//! [`ViewerState::finish_layout`].

mod chrome;
mod filters;
mod layer;
pub mod lenient;
mod region;
mod viewer;
mod viewport;

pub use chrome::{ButtonKind, Chrome, DownloadButton, MenuItem};
pub use filters::{FilterItem, FilterState, DEFAULT_COMPOSITE_MODE};
pub use layer::{ControlValue, Layer, LayerControl, Visibility};
pub use region::{Region, RegionPoint, RegionSet};
pub use viewer::ViewerState;
pub use viewport::{Rect, Viewport};
