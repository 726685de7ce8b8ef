//! Project chrome: title, dataset buttons, menu entries and the legend.

/// How a dataset button is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    /// One file, one button
    Single,
    /// Several files behind a dropdown
    Dropdown,
}

/// A button that loads a marker or region dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadButton {
    /// Position of the descriptor in the project's file list
    pub index: usize,
    pub kind: ButtonKind,
    pub title: String,
    pub comment: String,
    pub paths: Vec<String>,
}

impl DownloadButton {
    /// Build a button; more than one path, or an explicit list, makes a dropdown.
    pub fn new(index: usize, paths: Vec<String>, is_list: bool) -> Self {
        let kind = if is_list {
            ButtonKind::Dropdown
        } else {
            ButtonKind::Single
        };
        Self {
            index,
            kind,
            title: String::new(),
            comment: String::new(),
            paths,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// A custom menu entry opening `url`.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    /// Menu path, e.g. `["File", "Save project"]`
    pub path: Vec<String>,
    pub url: String,
}

/// Everything around the slide that a project file can change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chrome {
    pub title: String,
    pub title_link: Option<String>,
    pub tabs_hidden: bool,
    pub marker_buttons: Vec<DownloadButton>,
    pub region_buttons: Vec<DownloadButton>,
    pub menu_items: Vec<MenuItem>,
    legend: Option<String>,
}

impl Chrome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the marker legend, or hide it when `content` is empty.
    pub fn set_legend(&mut self, content: &str) {
        if content.is_empty() {
            self.legend = None;
        } else {
            self.legend = Some(content.to_string());
        }
    }

    pub fn legend(&self) -> Option<&str> {
        self.legend.as_deref()
    }

    pub fn add_menu_item(&mut self, path: Vec<String>, url: impl Into<String>) {
        self.menu_items.push(MenuItem {
            path,
            url: url.into(),
        });
    }
}
