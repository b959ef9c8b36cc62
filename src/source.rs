//! Images the cache can derive from.
//!
//! Two types, one trait:
//!
//! - [`SourceImage`] is an original: a stored record with an id, a filename,
//!   an optional parent folder and a display title. Replacing its bytes must
//!   be followed by an invalidation sweep.
//! - [`CachedImage`] is a derivative: nothing but the resolved path of a
//!   generated file. It has no record behind it, so sweeping it is a no-op,
//!   but it can itself be formatted again.
//!
//! [`ImageSource`] lets rendering and formatting code treat both uniformly.

use std::path::Path;
use walkdir::WalkDir;

use crate::imaging::supported_input_extensions;
use crate::naming::RESAMPLED_DIR;
use crate::storage::parent_dir;

pub trait ImageSource {
    /// Relative path of the image bytes, if one has been assigned.
    fn filename(&self) -> Option<&str>;

    /// Folder whose `_resampled/` directory holds this image's derivatives.
    /// `None` means the assets root.
    fn parent_folder(&self) -> Option<&str>;

    /// Whether the image is backed by a record (or is a derivative of one).
    fn has_identity(&self) -> bool;

    fn title(&self) -> Option<&str> {
        None
    }

    fn is_derivative(&self) -> bool {
        false
    }

    /// Last path segment of the filename.
    fn base_name(&self) -> Option<&str> {
        self.filename().map(base_name)
    }
}

/// Last `/`-separated segment of a path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// A folder record that images can live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Relative path of the folder, e.g. `assets/Uploads/`.
    pub filename: String,
}

impl Folder {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// An original image record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceImage {
    pub id: Option<u64>,
    pub filename: Option<String>,
    pub parent: Option<Folder>,
    pub title: Option<String>,
}

impl SourceImage {
    pub fn new(id: u64, filename: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            filename: Some(filename.into()),
            parent: None,
            title: None,
        }
    }

    pub fn with_parent(mut self, folder: Folder) -> Self {
        self.parent = Some(folder);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Build a record for a file found at `path` under the storage root.
    ///
    /// Files directly inside `assets_dir` have no parent folder; anything
    /// deeper (or outside the assets directory) uses its own directory.
    pub fn from_asset_path(id: u64, path: &str, assets_dir: &str) -> Self {
        let path = path.trim_start_matches('/');
        let image = Self::new(id, path);
        match parent_dir(path) {
            Some(dir) if dir.trim_end_matches('/') != assets_dir.trim_matches('/') => {
                image.with_parent(Folder::new(format!("{dir}/")))
            }
            _ => image,
        }
    }
}

impl ImageSource for SourceImage {
    fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }

    fn parent_folder(&self) -> Option<&str> {
        self.parent.as_ref().map(|f| f.filename.as_str())
    }

    fn has_identity(&self) -> bool {
        self.id.is_some_and(|id| id > 0)
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

/// A generated derivative, identified only by where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    path: String,
}

impl CachedImage {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ImageSource for CachedImage {
    fn filename(&self) -> Option<&str> {
        Some(&self.path)
    }

    fn parent_folder(&self) -> Option<&str> {
        parent_dir(&self.path)
    }

    fn has_identity(&self) -> bool {
        true
    }

    fn is_derivative(&self) -> bool {
        true
    }
}

/// Every decodable image under `{root}/{assets_dir}`, skipping
/// `_resampled/` directories. Ids are assigned in path order, from 1.
pub fn discover_sources(root: &Path, assets_dir: &str) -> Vec<SourceImage> {
    let assets = root.join(assets_dir.trim_matches('/'));
    let mut paths: Vec<String> = WalkDir::new(&assets)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != RESAMPLED_DIR)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    supported_input_extensions()
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(ext))
                })
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            Some(parts.join("/"))
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .zip(1..)
        .map(|(path, id)| SourceImage::from_asset_path(id, path, assets_dir))
        .collect()
}
