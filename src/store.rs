//! Server-side project store.
//!
//! Projects live as `<path>.tmap` files under a root folder. Every path comes
//! from a client, so it is resolved lexically and rejected when it leaves the
//! root. A folder can be protected by an `auth` file holding
//! `user;password`; it applies to everything below it.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::format::{FormatError, ProjectState, to_json_indented};

/// Name of the per-folder credentials file.
pub const AUTH_FILE: &str = "auth";

/// Folder names never listed.
const HIDDEN_DIRS: [&str; 2] = [".tissuumaps", "private"];

/// Extensions listed in the file tree when no filter is given.
const KNOWN_EXTENSIONS: [&str; 17] = [
    // whole-slide formats
    "svs", "tif", "tiff", "ndpi", "vms", "vmu", "scn", "mrxs", "svslide", "bif",
    // plain images
    "png", "jpg", "jpeg", "gif", "bmp", "webp",
    // projects
    "tmap",
];

/// Basic-auth credentials read from an `auth` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Parse `user;password`, ignoring line breaks and surrounding spaces.
    pub fn parse(content: &str) -> Result<Self, FormatError> {
        let joined = content.replace(['\r', '\n'], "");
        let mut parts = joined.split(';').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(password), None) => Ok(Self {
                user: user.to_string(),
                password: password.to_string(),
            }),
            _ => Err(FormatError::invalid_format("auth file must hold user;password")),
        }
    }
}

/// A listed folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub name: String,
    pub children: Vec<Entry>,
}

/// A listed file, addressed by its `/`-separated path below the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideFile {
    pub name: String,
    pub url_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    Directory(Directory),
    File(SlideFile),
}

/// Root folder holding `.tmap` projects and their data.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client path below the root.
    ///
    /// Absolute paths and paths climbing above the root are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, FormatError> {
        let mut parts: Vec<&str> = Vec::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    parts.push(part.to_str().ok_or_else(|| FormatError::outside_root(relative))?)
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(FormatError::outside_root(relative));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FormatError::outside_root(relative));
                }
            }
        }
        Ok(parts.iter().fold(self.root.clone(), |path, part| path.join(part)))
    }

    fn project_file(&self, path: &str) -> Result<PathBuf, FormatError> {
        self.resolve(&format!("{path}.{}", ProjectState::TMAP_EXTENSION))
    }

    /// Read `<path>.tmap`.
    pub fn load(&self, path: &str) -> Result<ProjectState, FormatError> {
        let file = self.project_file(path)?;
        if !file.is_file() {
            return Err(FormatError::not_found(file));
        }
        let json = std::fs::read_to_string(&file)?;
        let state = ProjectState::from_json(&json)?;
        log::info!("Served project {:?}", file);
        Ok(state)
    }

    /// Write `<path>.tmap` with sorted keys and return the stored document.
    pub fn save(&self, path: &str, state: &ProjectState) -> Result<Value, FormatError> {
        let file = self.project_file(path)?;
        // Objects in a `Value` are key-sorted
        let document = serde_json::to_value(state)?;
        std::fs::write(&file, to_json_indented(&document)?)?;
        log::info!("Stored project {:?}", file);
        Ok(document)
    }

    /// Plugins a stored project asks for.
    pub fn plugins(&self, path: &str) -> Result<Vec<String>, FormatError> {
        Ok(self.load(path)?.plugins.unwrap_or_default())
    }

    /// Credentials protecting `path`: the nearest `auth` file from the file's
    /// folder up to the root.
    pub fn credentials_for(&self, path: &str) -> Result<Option<Credentials>, FormatError> {
        let resolved = self.resolve(path)?;
        let mut folder = resolved.parent();
        while let Some(dir) = folder {
            if !dir.starts_with(&self.root) {
                break;
            }
            let auth = dir.join(AUTH_FILE);
            if auth.is_file() {
                log::debug!("Using credentials from {:?}", auth);
                let content = std::fs::read_to_string(&auth)?;
                return Credentials::parse(&content).map(Some);
            }
            folder = dir.parent();
        }
        Ok(None)
    }

    /// List the root down to `max_depth` levels.
    pub fn file_tree(&self, max_depth: usize, filter: Option<&str>) -> Directory {
        self.directory("", max_depth, filter)
    }

    /// List the folder `relative` down to `max_depth` levels.
    ///
    /// Folders without listed files are dropped. With a filter, only files
    /// whose name contains it are kept; files also need a known extension.
    pub fn directory(&self, relative: &str, max_depth: usize, filter: Option<&str>) -> Directory {
        let name = Path::new(relative)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut directory = Directory {
            name,
            children: Vec::new(),
        };
        if max_depth == 0 {
            return directory;
        }
        let Ok(folder) = self.resolve(relative) else {
            log::warn!("Not listing {:?}: outside of the root", relative);
            return directory;
        };

        let mut names: Vec<String> = match std::fs::read_dir(&folder) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(e) => {
                log::warn!("Failed to list {:?}: {}", folder, e);
                return directory;
            }
        };
        names.sort();

        for entry_name in names {
            if HIDDEN_DIRS.contains(&entry_name.as_str()) {
                continue;
            }
            let child_relative = if relative.is_empty() {
                entry_name.clone()
            } else {
                format!("{}/{}", relative.trim_end_matches('/'), entry_name)
            };

            if folder.join(&entry_name).is_dir() {
                let child = self.directory(&child_relative, max_depth - 1, filter);
                if !child.children.is_empty() {
                    directory.children.push(Entry::Directory(child));
                }
                continue;
            }
            if filter.is_some_and(|f| !entry_name.contains(f)) {
                continue;
            }
            if is_listed_file(&entry_name) {
                directory.children.push(Entry::File(SlideFile {
                    name: entry_name,
                    url_path: child_relative.replace('\\', "/"),
                }));
            }
        }
        directory
    }
}

fn is_listed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            KNOWN_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, store) = store();
        assert!(store.resolve("a/b/../c").is_ok());
        assert!(matches!(
            store.resolve("../etc/passwd"),
            Err(FormatError::PathOutsideRoot { .. })
        ));
        assert!(store.resolve("a/../../x").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert_eq!(store.resolve("a/./b").unwrap(), store.root().join("a").join("b"));
    }

    #[test]
    fn test_save_is_sorted_and_indented() {
        let (dir, store) = store();
        let mut state = ProjectState::new();
        state.filename = Some("z".into());
        state.composite_mode = Some("lighter".into());
        state.extra.insert("aaa".into(), Value::from(1));

        let document = store.save("project", &state).unwrap();
        assert_eq!(document["filename"], "z");

        let written = fs::read_to_string(dir.path().join("project.tmap")).unwrap();
        assert_eq!(
            written,
            "{\n    \"aaa\": 1,\n    \"compositeMode\": \"lighter\",\n    \"filename\": \"z\"\n}"
        );
        assert_eq!(store.load("project").unwrap(), state);
    }

    #[test]
    fn test_load_errors() {
        let (dir, store) = store();
        assert!(matches!(store.load("missing"), Err(FormatError::NotFound { .. })));

        fs::write(dir.path().join("broken.tmap"), "{not json").unwrap();
        assert!(matches!(store.load("broken"), Err(FormatError::Json(_))));
    }

    #[test]
    fn test_plugins() {
        let (dir, store) = store();
        fs::write(dir.path().join("with.tmap"), r#"{"plugins": ["Points2Regions"]}"#).unwrap();
        fs::write(dir.path().join("without.tmap"), "{}").unwrap();
        assert_eq!(store.plugins("with").unwrap(), vec!["Points2Regions".to_string()]);
        assert!(store.plugins("without").unwrap().is_empty());
    }

    #[test]
    fn test_nearest_auth_file_wins() {
        let (dir, store) = store();
        fs::create_dir_all(dir.path().join("lab/private/deep")).unwrap();
        fs::write(dir.path().join("lab/auth"), "alice; secret\n").unwrap();
        fs::write(dir.path().join("lab/private/auth"), "bob;hunter2").unwrap();

        let creds = store.credentials_for("lab/private/deep/slide.tif").unwrap().unwrap();
        assert_eq!(creds.user, "bob");

        let creds = store.credentials_for("lab/slide.tif").unwrap().unwrap();
        assert_eq!((creds.user.as_str(), creds.password.as_str()), ("alice", "secret"));

        assert_eq!(store.credentials_for("open/slide.tif").unwrap(), None);
    }

    #[test]
    fn test_malformed_auth_file() {
        assert!(Credentials::parse("no separator").is_err());
        assert!(Credentials::parse("a;b;c").is_err());
    }

    #[test]
    fn test_file_tree() {
        let (dir, store) = store();
        let root = dir.path();
        fs::create_dir_all(root.join("b_slides/nested")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::create_dir_all(root.join("private")).unwrap();
        fs::create_dir_all(root.join(".tissuumaps")).unwrap();
        fs::write(root.join("b_slides/one.svs"), "").unwrap();
        fs::write(root.join("b_slides/notes.txt"), "").unwrap();
        fs::write(root.join("b_slides/nested/two.tif"), "").unwrap();
        fs::write(root.join("private/secret.tif"), "").unwrap();
        fs::write(root.join(".tissuumaps/cache.png"), "").unwrap();
        fs::write(root.join("a.tmap"), "{}").unwrap();

        let tree = store.file_tree(4, None);
        assert_eq!(tree.children.len(), 2);
        assert!(matches!(&tree.children[0], Entry::File(f) if f.url_path == "a.tmap"));
        let Entry::Directory(slides) = &tree.children[1] else {
            panic!("expected a directory");
        };
        assert_eq!(slides.name, "b_slides");
        assert_eq!(slides.children.len(), 2);
        let Entry::Directory(nested) = &slides.children[0] else {
            panic!("expected a directory");
        };
        assert!(matches!(&nested.children[0], Entry::File(f) if f.url_path == "b_slides/nested/two.tif"));

        let shallow = store.file_tree(1, None);
        assert_eq!(shallow.children.len(), 1);

        let projects = store.file_tree(4, Some(".tmap"));
        assert_eq!(projects.children.len(), 1);
    }
}
