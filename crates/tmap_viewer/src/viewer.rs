//! The viewer model and its layout pass.

use std::fmt;

use crate::chrome::Chrome;
use crate::filters::FilterState;
use crate::layer::{ControlValue, Layer, LayerControl};
use crate::region::RegionSet;
use crate::viewport::Viewport;

type LayoutCallback = Box<dyn FnOnce(&mut ViewerState)>;

/// Complete viewer-side state a project can be loaded into or captured from.
///
/// Adding layers to the rendered world starts a layout pass. Work that needs
/// the new layers laid out (viewport framing, control restoration) is queued
/// with [`after_layout`](Self::after_layout) and runs when the host calls
/// [`finish_layout`](Self::finish_layout).
pub struct ViewerState {
    layers: Vec<Layer>,
    controls: Vec<LayerControl>,
    pub viewport: Viewport,
    pub filters: FilterState,
    pub regions: RegionSet,
    pub chrome: Chrome,
    layout_pending: bool,
    after_layout: Vec<LayoutCallback>,
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            controls: Vec::new(),
            viewport: Viewport::new(),
            filters: FilterState::new(),
            regions: RegionSet::new(),
            chrome: Chrome::new(),
            layout_pending: false,
            after_layout: Vec::new(),
        }
    }

    // ---- layers ----

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Replace the layer list. The rendered world is left untouched until
    /// [`add_all_layers`](Self::add_all_layers).
    ///
    /// Work queued for the previous layers is dropped.
    pub fn set_layers(&mut self, layers: Vec<Layer>) {
        if !self.after_layout.is_empty() {
            log::debug!(
                "Dropping {} callbacks queued for the previous layers",
                self.after_layout.len()
            );
            self.after_layout.clear();
        }
        self.layers = layers;
    }

    /// Append a single layer and its control, starting a layout pass.
    pub fn push_layer(&mut self, layer: Layer) -> usize {
        log::debug!("Adding layer '{}' ({})", layer.name, layer.tile_source);
        self.layers.push(layer);
        self.controls.push(LayerControl::default());
        self.layout_pending = true;
        self.layers.len() - 1
    }

    /// Remove every layer from the rendered world.
    pub fn remove_all(&mut self) {
        self.controls.clear();
    }

    /// Add every layer of the list to the rendered world with fresh controls.
    pub fn add_all_layers(&mut self) {
        self.controls = vec![LayerControl::default(); self.layers.len()];
        self.layout_pending = true;
        log::debug!("Added {} layers, layout pending", self.layers.len());
    }

    // ---- controls ----

    pub fn controls(&self) -> &[LayerControl] {
        &self.controls
    }

    pub fn control(&self, index: usize) -> Option<&LayerControl> {
        self.controls.get(index)
    }

    /// Set the opacity slider of a layer. Returns false for unknown layers.
    pub fn set_opacity(&mut self, index: usize, opacity: ControlValue) -> bool {
        match self.controls.get_mut(index) {
            Some(control) => {
                control.opacity = opacity;
                true
            }
            None => {
                log::warn!("No control for layer {}", index);
                false
            }
        }
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> bool {
        match self.controls.get_mut(index) {
            Some(control) => {
                control.visible = visible;
                true
            }
            None => {
                log::warn!("No control for layer {}", index);
                false
            }
        }
    }

    /// Flip the visibility checkbox of a layer.
    pub fn toggle_visible(&mut self, index: usize) -> Option<bool> {
        let control = self.controls.get_mut(index)?;
        control.visible = !control.visible;
        Some(control.visible)
    }

    pub fn hide_all(&mut self) {
        for control in &mut self.controls {
            control.visible = false;
        }
    }

    // ---- layout ----

    pub fn is_layout_pending(&self) -> bool {
        self.layout_pending
    }

    /// Run `f` once the current layout pass completes, or now when no pass is
    /// pending.
    pub fn after_layout<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ViewerState) + 'static,
    {
        if self.layout_pending {
            self.after_layout.push(Box::new(f));
        } else {
            f(self);
        }
    }

    /// Signal that the layout pass finished and run the queued work.
    ///
    /// Returns the number of callbacks executed. Callbacks queued while
    /// draining run in the same call.
    pub fn finish_layout(&mut self) -> usize {
        self.layout_pending = false;
        let mut executed = 0;
        while !self.after_layout.is_empty() {
            let callbacks = std::mem::take(&mut self.after_layout);
            for callback in callbacks {
                callback(self);
                executed += 1;
            }
            // Callbacks may start a new pass; finish it too
            self.layout_pending = false;
        }
        if executed > 0 {
            log::debug!("Layout finished, ran {} deferred callbacks", executed);
        }
        executed
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerState")
            .field("layers", &self.layers)
            .field("controls", &self.controls)
            .field("viewport", &self.viewport)
            .field("filters", &self.filters)
            .field("regions", &self.regions.len())
            .field("chrome", &self.chrome)
            .field("layout_pending", &self.layout_pending)
            .field("after_layout", &self.after_layout.len())
            .finish()
    }
}
