//! Path handling for project documents: common prefixes, rebasing onto
//! another folder and the static-export rewrite.

use std::path::{Component, Path};

use tmap_viewer::Layer;

use crate::format::state::ProjectState;

/// Folder layer images are exported to.
pub const STATIC_IMAGES_DIR: &str = "data/images";
/// Folder marker and region files are exported to.
pub const STATIC_FILES_DIR: &str = "data/files";

/// Longest shared prefix of the layers' tile sources, cut after its last `/`.
///
/// An empty slice gives `""`; a single layer gives its folder with the
/// trailing slash.
pub fn common_path(layers: &[Layer]) -> String {
    let Some((first, rest)) = layers.split_first() else {
        return String::new();
    };
    let rest: Vec<Vec<char>> = rest.iter().map(|l| l.tile_source.chars().collect()).collect();

    let mut prefix = String::new();
    for (i, c) in first.tile_source.chars().enumerate() {
        if rest.iter().any(|other| other.get(i) != Some(&c)) {
            break;
        }
        prefix.push(c);
    }
    truncate_after_last_slash(&prefix).to_string()
}

fn truncate_after_last_slash(s: &str) -> &str {
    match s.rfind('/') {
        Some(i) => &s[..=i],
        None => "",
    }
}

/// Prefix every data path of `state` with `<prefix>/`.
///
/// Touches layer tile sources, marker and region file paths (each element of
/// a list) and `regionFile`. Absent fields are skipped.
pub fn rebase(state: &mut ProjectState, prefix: &str) {
    let prefix = prefix.replace('\\', "/");
    let join = |path: &str| format!("{prefix}/{path}");

    for layer in state.layers.iter_mut().flatten() {
        layer.tile_source = join(&layer.tile_source);
    }
    for marker in state.marker_files.iter_mut().flatten() {
        marker.path.map_in_place(join);
    }
    for region in state.region_files.iter_mut().flatten() {
        region.path.map_in_place(join);
    }
    if let Some(region_file) = state.region_file.as_mut() {
        *region_file = join(region_file.as_str());
    }
    log::debug!("Rebased project paths onto {:?}", prefix);
}

/// Relative, `/`-separated path leading from `from_dir` to `to_dir`.
///
/// Both paths are compared lexically; identical folders give `"."`.
pub fn relative_prefix(from_dir: &Path, to_dir: &Path) -> String {
    let from: Vec<Component<'_>> = normalized(from_dir);
    let to: Vec<Component<'_>> = normalized(to_dir);

    let shared = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - shared];
    parts.extend(
        to[shared..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn normalized(path: &Path) -> Vec<Component<'_>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            other => components.push(other),
        }
    }
    components
}

/// Source paths collected by [`rewrite_for_static`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAssets {
    /// Tile sources of the layers, as they were in the project
    pub images: Vec<ImageSource>,
    /// Marker and region files, as they were in the project
    pub files: Vec<String>,
}

/// A layer image and where its export goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub source: String,
    pub target: String,
}

/// Point every data path of `state` into the static export layout and
/// collect the original paths.
pub fn rewrite_for_static(state: &mut ProjectState) -> StaticAssets {
    let mut assets = StaticAssets::default();

    for layer in state.layers.iter_mut().flatten() {
        let target = format!("{STATIC_IMAGES_DIR}/{}", basename(&layer.tile_source));
        assets.images.push(ImageSource {
            source: layer.tile_source.clone(),
            target: target.clone(),
        });
        layer.tile_source = target;
    }

    let mut rewrite_file = |path: &str| {
        assets.files.push(path.to_string());
        format!("{STATIC_FILES_DIR}/{}", basename(path))
    };
    let file_paths = state
        .marker_files
        .iter_mut()
        .flatten()
        .map(|m| &mut m.path)
        .chain(state.region_files.iter_mut().flatten().map(|r| &mut r.path));
    for path in file_paths {
        path.map_in_place(&mut rewrite_file);
    }
    if let Some(region_file) = state.region_file.as_mut() {
        *region_file = rewrite_file(region_file.as_str());
    }

    log::debug!(
        "Static layout: {} images, {} files",
        assets.images.len(),
        assets.files.len()
    );
    assets
}

/// Last component of a `/` or `\` separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

