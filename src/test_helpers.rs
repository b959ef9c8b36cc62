//! Shared test utilities for the resampler test suite.
//!
//! Provides synthetic images and an isolated storage root with an `assets/`
//! directory, so tests can exercise the cache against a real filesystem.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = TestSite::new();
//! let photo = site.add_source("assets/photo.jpg");
//! assert!(site.storage().exists("assets/photo.jpg"));
//! ```

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use crate::source::SourceImage;
use crate::storage::{FsStorage, Storage};

// =========================================================================
// Synthetic images
// =========================================================================

/// Write a gradient JPEG of the given size to `path`.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut file = std::fs::File::create(path).unwrap();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut file, 90);
    img.write_with_encoder(encoder).unwrap();
}

// =========================================================================
// Storage fixture
// =========================================================================

/// A temporary storage root. The directory is removed on drop.
pub struct TestSite {
    tmp: TempDir,
    storage: Arc<FsStorage>,
}

impl TestSite {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("assets")).unwrap();
        let storage = Arc::new(FsStorage::new(tmp.path()));
        Self { tmp, storage }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn storage(&self) -> Arc<FsStorage> {
        Arc::clone(&self.storage)
    }

    /// Store placeholder bytes at `path` and return a record for it.
    ///
    /// Enough for the mock backend, which never decodes.
    pub fn add_source(&self, path: &str) -> SourceImage {
        if let Some(parent) = self.root().join(path).parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        self.storage.write(path, b"source bytes").unwrap();
        SourceImage::from_asset_path(1, path, "assets")
    }

    /// Contents of a stored file. Panics if missing.
    pub fn read(&self, path: &str) -> Vec<u8> {
        std::fs::read(self.root().join(path))
            .unwrap_or_else(|e| panic!("could not read '{path}': {e}"))
    }
}
