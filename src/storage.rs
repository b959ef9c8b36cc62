//! Durable storage for source images and their derivatives.
//!
//! Every path handled by the crate is *relative*, `/`-separated, and rooted
//! at the site's base folder (e.g. `assets/Uploads/photo.jpg`). A
//! [`Storage`] maps those paths onto real bytes. [`FsStorage`] is the
//! filesystem implementation.
//!
//! Writes go through a temporary sibling file and a rename, so a reader never
//! observes a half-written derivative.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

pub trait Storage: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    /// Write `bytes` to `path`, replacing any previous content.
    ///
    /// The parent directory must exist; see [`Storage::ensure_directory`].
    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()>;

    /// Delete the file at `path`. Returns `false` if there was nothing to delete.
    fn delete(&self, path: &str) -> io::Result<bool>;

    /// Create `path` and any missing parents.
    fn ensure_directory(&self, path: &str) -> io::Result<()>;

    /// Absolute location of `path`, for backends that read files directly.
    fn locate(&self, path: &str) -> PathBuf;
}

/// Storage backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Parent directory of a relative path, if it has one.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(dir, _)| dir)
        .filter(|d| !d.is_empty())
}

impl Storage for FsStorage {
    fn exists(&self, path: &str) -> bool {
        self.locate(path).is_file()
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.locate(path);
        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let staging = target.with_file_name(format!(
            ".{}.{}-{}.tmp",
            name,
            std::process::id(),
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&staging, bytes)?;
        fs::rename(&staging, &target).inspect_err(|_| {
            let _ = fs::remove_file(&staging);
        })
    }

    fn delete(&self, path: &str) -> io::Result<bool> {
        match fs::remove_file(self.locate(path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn ensure_directory(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.locate(path))
    }

    fn locate(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}
