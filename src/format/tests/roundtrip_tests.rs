//! Save → load round trips through the JSON form.

use serde_json::Value;
use tmap_viewer::{ControlValue, FilterItem, Layer};

use crate::format::ProjectState;
use crate::session::Session;

/// A session with three layers and non-default controls.
fn populated_session() -> Session {
    let mut session = Session::new();
    let viewer = session.viewer_mut();
    viewer.set_layers(vec![
        Layer::new("DAPI", "slides/dapi.tif.dzi"),
        Layer::new("HE", "slides/he.tif.dzi"),
        Layer::new("Ki67", "slides/ki67.tif.dzi"),
    ]);
    viewer.add_all_layers();
    viewer.finish_layout();
    viewer.set_opacity(0, ControlValue::from("0.3"));
    viewer.set_opacity(2, ControlValue::Number(0.75));
    viewer.set_visible(1, false);
    viewer.filters.used = vec!["Brightness".into()];
    viewer
        .filters
        .items
        .insert(1, vec![FilterItem::new("Brightness", "0.2")]);
    viewer.filters.set_composite_mode("lighter");
    session
}

fn reload(state: &ProjectState) -> Session {
    let json = state.to_json().unwrap();
    let mut session = Session::new();
    session.load_project_json(&json).unwrap();
    session.viewer_mut().finish_layout();
    session
}

#[test]
fn test_layers_and_controls_survive() {
    let original = populated_session();
    let saved = original.capture();
    let restored = reload(&saved);

    assert_eq!(restored.viewer().layers(), original.viewer().layers());
    assert_eq!(restored.viewer().controls(), original.viewer().controls());

    let again = restored.capture();
    assert_eq!(again.layer_opacities, saved.layer_opacities);
    assert_eq!(again.layer_visibilities, saved.layer_visibilities);
}

#[test]
fn test_filters_survive() {
    let original = populated_session();
    let restored = reload(&original.capture());

    let filters = &restored.viewer().filters;
    assert_eq!(filters.used, vec!["Brightness".to_string()]);
    assert_eq!(filters.items[&1][0], FilterItem::new("Brightness", "0.2"));
    assert_eq!(filters.composite_mode(), "lighter");
}

#[test]
fn test_saved_keys_are_index_strings() {
    let saved = populated_session().capture();
    let value: Value = serde_json::from_str(&saved.to_json().unwrap()).unwrap();

    assert_eq!(value["layerOpacities"]["0"], "0.3");
    assert_eq!(value["layerOpacities"]["2"], 0.75);
    assert_eq!(value["layerVisibilities"]["1"], false);
    assert_eq!(value["layers"][2]["tileSource"], "slides/ki67.tif.dzi");
}

#[test]
fn test_unknown_fields_survive_load_and_save() {
    let json = r#"{
        "filename": "Study",
        "schemaVersion": "1.1",
        "layers": [{"name": "a", "tileSource": "a.dzi"}],
        "markerFiles": [{"path": "m.csv", "title": "Download m", "customField": 3}]
    }"#;
    let mut session = Session::new();
    session.load_project_json(json).unwrap();
    session.viewer_mut().finish_layout();

    let saved = session.save_project("Study v2");
    let value: Value = serde_json::from_str(&saved.to_json().unwrap()).unwrap();
    assert_eq!(value["schemaVersion"], "1.1");
    assert_eq!(value["filename"], "Study v2");
    assert_eq!(value["markerFiles"][0]["customField"], 3);
    assert_eq!(value["markerFiles"][0]["fromButton"], 0);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = populated_session();
    let path = session.save_project_to(dir.path(), "roundtrip").unwrap();
    assert_eq!(path.file_name().unwrap(), "roundtrip.tmap");

    let mut restored = Session::new();
    restored.load_project(&path).unwrap();
    restored.viewer_mut().finish_layout();
    assert_eq!(restored.viewer().controls(), session.viewer().controls());
    assert_eq!(restored.viewer().chrome.title, "roundtrip");
}
