//! Image filters and layer compositing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Blend mode used until a project chooses another one.
pub const DEFAULT_COMPOSITE_MODE: &str = "source-over";

/// One filter setting on a layer, e.g. `{"name": "Contrast", "value": "1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterItem {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterItem {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Filter selection, per-layer filter values and the composite mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// Names of the filters enabled in the filter panel
    pub used: Vec<String>,
    /// Filter values keyed by layer index
    pub items: BTreeMap<usize, Vec<FilterItem>>,
    composite_mode: String,
    applied_mode: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self {
            used: Vec::new(),
            items: BTreeMap::new(),
            composite_mode: DEFAULT_COMPOSITE_MODE.to_string(),
            applied_mode: None,
        }
    }

    /// Selected composite mode (not necessarily applied yet).
    pub fn composite_mode(&self) -> &str {
        &self.composite_mode
    }

    pub fn set_composite_mode(&mut self, mode: impl Into<String>) {
        self.composite_mode = mode.into();
    }

    /// Push the selected composite mode to the rendered layers.
    pub fn apply_composite(&mut self) {
        log::debug!("Applying composite operation '{}'", self.composite_mode);
        self.applied_mode = Some(self.composite_mode.clone());
    }

    /// Composite mode the layers are currently drawn with.
    pub fn applied_composite(&self) -> Option<&str> {
        self.applied_mode.as_deref()
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_selected_then_applied() {
        let mut filters = FilterState::new();
        assert_eq!(filters.composite_mode(), DEFAULT_COMPOSITE_MODE);
        assert!(filters.applied_composite().is_none());

        filters.set_composite_mode("lighter");
        assert!(filters.applied_composite().is_none());
        filters.apply_composite();
        assert_eq!(filters.applied_composite(), Some("lighter"));
    }

    #[test]
    fn test_filter_item_value_is_kept_verbatim() {
        let item: FilterItem = serde_json::from_str(r#"{"name":"Color","value":"100,0,0"}"#).unwrap();
        assert_eq!(item.value, serde_json::json!("100,0,0"));
    }
}
