//! Export of a project to a self-contained static folder.
//!
//! The exported folder holds `project.tmap` with every path pointing into
//! `data/`, copies of the marker and region files, and the unpacked web
//! viewer bundle. Layer images are listed in the report; converting them to
//! tiles is left to an external tool.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::format::paths::{STATIC_FILES_DIR, STATIC_IMAGES_DIR, basename, rewrite_for_static};
use crate::format::{FormatError, ImageSource, ProjectState};

/// File name of the exported project.
pub const EXPORTED_PROJECT: &str = "project.tmap";

/// Outcome of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub project: PathBuf,
    /// Layer images still to be converted, with their export targets
    pub images: Vec<ImageSource>,
    /// Data files copied into `data/files`
    pub copied: Vec<PathBuf>,
    /// Data files referenced by the project but not found
    pub missing: Vec<String>,
    /// Files unpacked from the web bundle
    pub bundle_files: usize,
}

/// Export `state` to `out_dir`.
///
/// Relative data paths are resolved against `source_dir`, the folder the
/// project's data lives in. A missing data file is reported, not fatal.
pub fn export_static(
    state: &ProjectState,
    source_dir: &Path,
    out_dir: &Path,
    web_bundle: Option<&Path>,
) -> Result<ExportReport, FormatError> {
    let mut exported = state.clone();
    let assets = rewrite_for_static(&mut exported);

    std::fs::create_dir_all(out_dir)?;
    let project = out_dir.join(EXPORTED_PROJECT);
    exported.save_to_file(&project)?;

    let images_dir = out_dir.join(STATIC_IMAGES_DIR);
    let files_dir = out_dir.join(STATIC_FILES_DIR);
    std::fs::create_dir_all(&images_dir)?;
    std::fs::create_dir_all(&files_dir)?;

    let mut report = ExportReport {
        project,
        images: assets.images,
        ..Default::default()
    };

    for file in &assets.files {
        let source = source_dir.join(file);
        if !source.is_file() {
            log::warn!("Data file {:?} not found, skipping", source);
            report.missing.push(file.clone());
            continue;
        }
        let target = files_dir.join(basename(file));
        std::fs::copy(&source, &target)?;
        log::debug!("Copied {:?} -> {:?}", source, target);
        report.copied.push(target);
    }

    if let Some(bundle) = web_bundle {
        log::info!("Unpacking web bundle {:?}", bundle);
        let archive = File::open(bundle)?;
        report.bundle_files = extract_bundle(archive, out_dir)?;
    }

    log::info!(
        "Exported project to {:?}: {} files copied, {} images to convert",
        out_dir,
        report.copied.len(),
        report.images.len()
    );
    Ok(report)
}

/// Unpack every file of a zip archive below `out_dir`.
///
/// Entries with unsafe names and macOS metadata are skipped. Returns the
/// number of files written.
fn extract_bundle<R: Read + Seek>(reader: R, out_dir: &Path) -> Result<usize, FormatError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping unsafe bundle entry {:?}", entry.name());
            continue;
        };
        if relative
            .components()
            .any(|c| c.as_os_str().eq_ignore_ascii_case("__macosx"))
        {
            log::trace!("Skipping metadata entry {:?}", relative);
            continue;
        }

        let target = out_dir.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&target)?;
        std::io::copy(&mut entry, &mut file)?;
        written += 1;
    }

    log::debug!("Unpacked {} bundle files", written);
    Ok(written)
}
