//! Capture and load of project state against a live [`Session`].
//!
//! Loading applies every field of a document independently, in a fixed
//! order; an absent field is skipped. Viewport work that needs the new layers
//! laid out is queued on the viewer and runs when the host reports layout
//! completion.

use std::collections::BTreeMap;

use tmap_viewer::{ControlValue, Rect, ViewerState, Visibility};

use crate::format::legacy::upgrade_marker_file;
use crate::format::settings::ReplaySummary;
use crate::format::state::ProjectState;
use crate::session::Session;

/// What a load did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub marker_buttons: usize,
    pub region_buttons: usize,
    /// Marker files translated from the legacy column description
    pub legacy_upgraded: usize,
    pub regions: usize,
    pub layers: usize,
    pub settings: ReplaySummary,
    pub menu_items: usize,
    /// Region file fetches queued for the host
    pub region_requests: Vec<String>,
    /// Whether viewport work is waiting for layout completion
    pub deferred: bool,
}

/// Snapshot the session as a project document.
///
/// Starts from the active document so fields this crate does not model are
/// kept, then overwrites everything the viewer owns. Control values are
/// stored as the controls hold them.
pub fn capture(session: &Session) -> ProjectState {
    let viewer = session.viewer();
    let mut state = session.active().clone();

    state.regions = Some(viewer.regions.clone());
    state.layers = Some(viewer.layers().to_vec());
    state.filters = Some(viewer.filters.used.clone());
    state.layer_filters = Some(viewer.filters.items.clone());
    state.composite_mode = Some(viewer.filters.composite_mode().to_string());

    let mut opacities = BTreeMap::new();
    let mut visibilities = BTreeMap::new();
    for index in 0..viewer.layer_count() {
        let control = viewer.control(index);
        if let Some(control) = control {
            opacities.insert(index, control.opacity.clone());
        }
        let visible = control.is_some_and(|c| c.visible);
        visibilities.insert(index, Visibility::Flag(visible));
    }
    state.layer_opacities = Some(opacities);
    state.layer_visibilities = Some(visibilities);

    log::debug!("Captured project with {} layers", state.layer_count());
    state
}

/// Load `state` into the session.
pub fn load(session: &mut Session, state: ProjectState) -> LoadReport {
    let mut report = LoadReport::default();

    session.viewer.chrome.marker_buttons.clear();
    session.viewer.chrome.region_buttons.clear();

    if let Some(regions) = state.regions.as_ref().filter(|r| !r.is_empty()) {
        report.regions = regions.len();
        session
            .viewer
            .regions
            .extend(regions.iter().map(|(id, region)| (id.clone(), region.clone())));
    }
    if let Some(region_file) = state.region_file.as_deref() {
        match session.base_path.as_deref() {
            Some(base) => {
                let request = format!("{base}/{region_file}");
                log::debug!("Queueing region file {}", request);
                session.region_requests.push(request.clone());
                report.region_requests.push(request);
            }
            None => log::warn!("No base path, ignoring region file {}", region_file),
        }
    }

    session.active = state;
    if let Some(mode) = session.active.composite_mode.as_deref().filter(|m| !m.is_empty()) {
        session.viewer.filters.set_composite_mode(mode);
    }

    load_buttons(session, &mut report);

    let active = &session.active;
    let viewer = &mut session.viewer;

    if let Some(filename) = active.filename.as_deref().filter(|f| !f.is_empty()) {
        session.slide_filename = Some(filename.to_string());
        viewer.chrome.title = filename.to_string();
    }
    if let Some(link) = active.link.as_deref().filter(|l| !l.is_empty()) {
        viewer.chrome.title_link = Some(link.to_string());
    }
    if let Some(settings) = active.settings.as_deref() {
        report.settings = session.settings.apply_all(viewer, settings);
    }
    if active.hide_tabs == Some(true) {
        viewer.chrome.tabs_hidden = true;
    }
    for button in active.menu_buttons.iter().flatten() {
        viewer.chrome.add_menu_item(vec![button.text.clone()], &button.url);
        report.menu_items += 1;
    }

    load_layers(viewer, active, &mut report);

    log::info!(
        "Loaded project {:?}: {} layers, {} marker buttons, {} region buttons",
        active.filename.as_deref().unwrap_or_default(),
        report.layers,
        report.marker_buttons,
        report.region_buttons
    );
    report
}

/// Marker and region buttons, upgrading legacy marker files on the way.
fn load_buttons(session: &mut Session, report: &mut LoadReport) {
    let active = &mut session.active;
    let chrome = &mut session.viewer.chrome;

    if let Some(markers) = active.marker_files.as_mut() {
        let mut hide_tabs = false;
        for (index, marker) in markers.iter_mut().enumerate() {
            marker.from_button = Some(index);
            if upgrade_marker_file(marker) {
                report.legacy_upgraded += 1;
                hide_tabs = true;
            }
            chrome.marker_buttons.push(marker.button(index));
        }
        report.marker_buttons = markers.len();
        if hide_tabs {
            active.hide_tabs = Some(true);
        }
    }

    if let Some(regions) = active.region_files.as_ref() {
        for (index, region) in regions.iter().enumerate() {
            chrome.region_buttons.push(region.button(index));
        }
        report.region_buttons = regions.len();
    }
}

/// Replace the layer list and rebuild controls, then queue the viewport
/// adjustments.
fn load_layers(viewer: &mut ViewerState, state: &ProjectState, report: &mut LoadReport) {
    let Some(layers) = state.layers.as_ref() else {
        log::warn!("Project has no layer list, keeping current layers");
        return;
    };
    viewer.set_layers(layers.clone());
    report.layers = layers.len();

    if let Some(filters) = state.filters.as_ref() {
        viewer.filters.used = filters.clone();
    }
    if let Some(items) = state.layer_filters.as_ref() {
        viewer.filters.items = items.clone();
    }

    viewer.remove_all();
    viewer.add_all_layers();

    let controls = match (&state.layer_opacities, &state.layer_visibilities) {
        (Some(opacities), Some(visibilities)) => {
            viewer.hide_all();
            Some((opacities.clone(), visibilities.clone()))
        }
        _ => None,
    };

    let composite = state
        .composite_mode
        .clone()
        .filter(|mode| !mode.is_empty());
    if let Some(mode) = composite.as_deref() {
        viewer.filters.set_composite_mode(mode);
        viewer.filters.apply_composite();
    }

    let deferred = DeferredViewport {
        rotate: state.rotate.filter(|r| *r != 0.0),
        bounding_box: state.bounding_box,
        composite,
        controls,
    };
    report.deferred = viewer.is_layout_pending();
    viewer.after_layout(move |viewer| deferred.apply(viewer));
}

/// Viewport work that waits for the layout pass.
struct DeferredViewport {
    rotate: Option<f64>,
    bounding_box: Option<Rect>,
    composite: Option<String>,
    controls: Option<(BTreeMap<usize, ControlValue>, BTreeMap<usize, Visibility>)>,
}

impl DeferredViewport {
    fn apply(self, viewer: &mut ViewerState) {
        if let Some(degrees) = self.rotate {
            viewer.viewport.set_rotation(degrees);
        }
        if let Some(rect) = self.bounding_box {
            viewer.viewport.fit_bounds(rect);
        }
        if let Some(mode) = self.composite {
            viewer.filters.set_composite_mode(mode);
            viewer.filters.apply_composite();
        }
        if let Some((opacities, visibilities)) = self.controls {
            for index in 0..viewer.layer_count() {
                if let Some(opacity) = opacities.get(&index) {
                    viewer.set_opacity(index, opacity.clone());
                }
                // A missing entry counts as visible
                if visibilities.get(&index).is_none_or(Visibility::is_visible) {
                    viewer.set_visible(index, true);
                }
            }
        }
        log::debug!("Applied deferred viewport settings");
    }
}
