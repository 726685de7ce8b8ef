//! Tests for common paths, rebasing and the static rewrite.

use std::path::Path;

use tmap_viewer::Layer;

use crate::format::paths::{basename, rewrite_for_static};
use crate::format::{FilePath, MarkerFile, ProjectState, RegionFile, common_path, rebase, relative_prefix};

fn layers(sources: &[&str]) -> Vec<Layer> {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| Layer::new(format!("layer{i}"), *s))
        .collect()
}

fn project() -> ProjectState {
    let mut state = ProjectState::new();
    state.layers = Some(layers(&["img/dapi.tif.dzi", "img/he.tif.dzi"]));
    state.marker_files = Some(vec![
        MarkerFile::new("csv/genes.csv"),
        MarkerFile::new(vec!["csv/a.csv".to_string(), "csv/b.csv".to_string()]),
    ]);
    state.region_files = Some(vec![RegionFile::new("regions/r.json")]);
    state.region_file = Some("regions/all.json".into());
    state
}

#[test]
fn test_common_path_empty() {
    assert_eq!(common_path(&[]), "");
}

#[test]
fn test_common_path_single_layer() {
    assert_eq!(common_path(&layers(&["data/slides/a.dzi"])), "data/slides/");
    assert_eq!(common_path(&layers(&["a.dzi"])), "");
}

#[test]
fn test_common_path_cuts_at_folder() {
    let shared = layers(&["data/slides/abc.dzi", "data/slides/abd.dzi"]);
    assert_eq!(common_path(&shared), "data/slides/");

    let split = layers(&["data/one/a.dzi", "data/two/a.dzi", "data/one/b.dzi"]);
    assert_eq!(common_path(&split), "data/");

    let nothing = layers(&["x/a.dzi", "y/a.dzi"]);
    assert_eq!(common_path(&nothing), "");
}

#[test]
fn test_common_path_of_identical_sources() {
    assert_eq!(common_path(&layers(&["s/a.dzi", "s/a.dzi"])), "s/");
}

#[test]
fn test_rebase_prefixes_every_path() {
    let mut state = project();
    rebase(&mut state, "../data");

    let layers = state.layers.as_ref().unwrap();
    assert_eq!(layers[0].tile_source, "../data/img/dapi.tif.dzi");
    let markers = state.marker_files.as_ref().unwrap();
    assert_eq!(markers[0].path, FilePath::from("../data/csv/genes.csv"));
    assert_eq!(markers[1].path.paths(), vec!["../data/csv/a.csv", "../data/csv/b.csv"]);
    assert_eq!(
        state.region_files.as_ref().unwrap()[0].path,
        FilePath::from("../data/regions/r.json")
    );
    assert_eq!(state.region_file.as_deref(), Some("../data/regions/all.json"));
}

#[test]
fn test_rebase_skips_missing_fields() {
    let mut state = ProjectState::new();
    state.filename = Some("only a name".into());
    let before = state.clone();
    rebase(&mut state, "x");
    assert_eq!(state, before);
}

#[test]
fn test_rebase_normalizes_backslashes() {
    let mut state = ProjectState::new();
    state.region_file = Some("r.json".into());
    rebase(&mut state, r"..\data");
    assert_eq!(state.region_file.as_deref(), Some("../data/r.json"));
}

#[test]
fn test_relative_prefix() {
    assert_eq!(relative_prefix(Path::new("/p/projects"), Path::new("/p/data")), "../data");
    assert_eq!(relative_prefix(Path::new("/p"), Path::new("/p/data/set")), "data/set");
    assert_eq!(relative_prefix(Path::new("/p/a/b"), Path::new("/p")), "../..");
    assert_eq!(relative_prefix(Path::new("/p/./a/../b"), Path::new("/p/b")), ".");
}

#[test]
fn test_static_rewrite() {
    let mut state = project();
    let assets = rewrite_for_static(&mut state);

    let layers = state.layers.as_ref().unwrap();
    assert_eq!(layers[1].tile_source, "data/images/he.tif.dzi");
    assert_eq!(assets.images[1].source, "img/he.tif.dzi");
    assert_eq!(assets.images[1].target, "data/images/he.tif.dzi");

    let markers = state.marker_files.as_ref().unwrap();
    assert_eq!(markers[0].path, FilePath::from("data/files/genes.csv"));
    assert_eq!(markers[1].path.paths(), vec!["data/files/a.csv", "data/files/b.csv"]);
    assert_eq!(state.region_file.as_deref(), Some("data/files/all.json"));

    assert_eq!(
        assets.files,
        vec![
            "csv/genes.csv",
            "csv/a.csv",
            "csv/b.csv",
            "regions/r.json",
            "regions/all.json"
        ]
    );
}

#[test]
fn test_basename() {
    assert_eq!(basename("a/b/c.csv"), "c.csv");
    assert_eq!(basename(r"a\b\c.csv"), "c.csv");
    assert_eq!(basename("c.csv"), "c.csv");
}
