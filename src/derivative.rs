//! Lazy get-or-generate cache of image derivatives.
//!
//! [`DerivativeCache`] ties the pieces together: a [`Storage`] for bytes, an
//! [`ImageBackend`] for pixels, a [`TransformRegistry`] for format names and
//! the [naming](crate::naming) convention for cache paths.
//!
//! ## Requesting a derivative
//!
//! ```text
//! source usable? ──no──▶ SourceUnusable
//!      │
//!      ▼
//! cache path exists and not forced? ──yes──▶ hit, return handle
//!      │
//!      ▼ (lock the path, check again)
//! resolve format ─▶ open source ─▶ apply transform ─▶ encode   [worker, timeout]
//!      │
//!      ▼
//! ensure `_resampled/`, write, record in ledger ─▶ return handle
//! ```
//!
//! A source is *usable* when it has an identity, a filename, and its bytes
//! are on storage. Generation happens only on a miss or when the caller
//! passes `force`; nothing else about the cached file is consulted.
//!
//! Every failure is recoverable. [`DerivativeCache::try_formatted`] reports
//! the reason; [`DerivativeCache::get_formatted`] logs it and degrades to
//! "nothing to render":
//!
//! | Failure | `get_formatted` |
//! |---|---|
//! | unusable source, unknown format, backend unavailable, declined transform, timeout | `None` (or the previous file if one is still there) |
//! | write failure | handle to the path, which holds no file |
//!
//! ## Invalidation
//!
//! [`DerivativeCache::invalidate`] removes every derivative of a source:
//! the zero-argument path of each registered format, plus every path the
//! ledger recorded for it. Derivatives themselves have nothing to sweep.
//!
//! The ledger is re-read from disk before every change, so caches in other
//! processes sharing the root see each other's entries. A swept path is
//! forgotten only if it is still absent when the ledger is updated; a path
//! regenerated in the meantime stays recorded.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use maud::Markup;
use rayon::prelude::*;
use thiserror::Error;

use crate::cache::{CacheStats, DerivativeLedger, ledger_path};
use crate::config::ResampleConfig;
use crate::imaging::{BackendError, Dimensions, ImageBackend, Orientation, PadColor, Quality, RustBackend};
use crate::locks::KeyedLocks;
use crate::naming::cache_path_for;
use crate::registry::{TransformArgs, TransformRegistry, UnknownFormat};
use crate::render;
use crate::source::{CachedImage, ImageSource, SourceImage};
use crate::storage::{FsStorage, Storage, parent_dir};

#[derive(Error, Debug)]
pub enum DerivativeError {
    #[error("source image is not usable: {0}")]
    SourceUnusable(String),
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormat),
    #[error("image processor unavailable: {0}")]
    ProcessorUnavailable(String),
    #[error("{format}{args} produced no output")]
    InvalidArguments { format: String, args: TransformArgs },
    #[error("generating {path} took longer than {timeout:?}")]
    Timeout { path: String, timeout: Duration },
    #[error("failed to write {path}: {source}")]
    WriteFailure {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("processing failed: {0}")]
    Processing(BackendError),
}

impl From<BackendError> for DerivativeError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unavailable(reason) => DerivativeError::ProcessorUnavailable(reason),
            other => DerivativeError::Processing(other),
        }
    }
}

/// Outcome of a bulk flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Files deleted.
    pub files: usize,
    /// Sources that had at least one file deleted.
    pub sources: usize,
}

impl fmt::Display for FlushReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} formatted images from {} items flushed",
            self.files, self.sources
        )
    }
}

pub struct DerivativeCache {
    storage: Arc<dyn Storage>,
    backend: Arc<dyn ImageBackend>,
    registry: TransformRegistry,
    assets_dir: String,
    timeout: Option<Duration>,
    locks: KeyedLocks,
    /// Serializes this process's ledger read-modify-write cycles.
    ledger: Mutex<()>,
    stats: CacheStats,
}

/// Result of sweeping one source's derivatives.
struct Sweep {
    filename: String,
    removed: usize,
    /// Candidates that are gone from storage, whether or not this sweep
    /// deleted them.
    swept: Vec<String>,
}

impl DerivativeCache {
    pub fn new(
        storage: Arc<dyn Storage>,
        backend: Arc<dyn ImageBackend>,
        registry: TransformRegistry,
        config: &ResampleConfig,
    ) -> Self {
        Self {
            storage,
            backend,
            registry,
            assets_dir: config.assets_root().to_string(),
            timeout: config.processing.timeout(),
            locks: KeyedLocks::new(),
            ledger: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    /// Filesystem storage at `root`, the `image`-crate backend and the
    /// built-in formats, all configured from `config`.
    pub fn from_config(root: impl Into<PathBuf>, config: &ResampleConfig) -> Self {
        let backend = RustBackend::with_output(
            Quality::new(config.output.quality),
            PadColor(config.output.pad_color),
        )
        .with_max_dimension(config.processing.max_dimension);
        Self::new(
            Arc::new(FsStorage::new(root)),
            Arc::new(backend),
            TransformRegistry::with_builtins(&config.presets),
            config,
        )
    }

    /// Override the processing timeout. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Where `format(args)` of `source` is (or would be) cached.
    pub fn cache_path(
        &self,
        source: &dyn ImageSource,
        format: &str,
        args: &TransformArgs,
    ) -> Option<String> {
        cache_path_for(source, &self.assets_dir, format, args)
    }

    /// Whether the bytes behind `source` are on storage.
    pub fn exists(&self, source: &dyn ImageSource) -> bool {
        source.filename().is_some_and(|f| self.storage.exists(f))
    }

    /// Get the derivative `format(args)` of `source`, generating it on a miss
    /// or when `force` is set.
    ///
    /// `None` means there is nothing to render; the reason is logged.
    pub fn get_formatted(
        &self,
        source: &dyn ImageSource,
        format: &str,
        args: &TransformArgs,
        force: bool,
    ) -> Option<CachedImage> {
        match self.try_formatted(source, format, args, force) {
            Ok(cached) => Some(cached),
            Err(DerivativeError::WriteFailure { path, source: e }) => {
                tracing::warn!(%path, error = %e, "could not write derivative");
                Some(CachedImage::new(path))
            }
            Err(DerivativeError::SourceUnusable(reason)) => {
                tracing::debug!(format, %reason, "nothing to format");
                None
            }
            Err(e) => {
                tracing::warn!(format, %args, error = %e, "derivative not generated");
                self.cache_path(source, format, args)
                    .filter(|path| self.storage.exists(path))
                    .map(CachedImage::new)
            }
        }
    }

    /// Like [`get_formatted`](Self::get_formatted), but reports why no
    /// derivative was produced.
    pub fn try_formatted(
        &self,
        source: &dyn ImageSource,
        format: &str,
        args: &TransformArgs,
        force: bool,
    ) -> Result<CachedImage, DerivativeError> {
        let filename = self.usable_filename(source)?;
        let path = self
            .cache_path(source, format, args)
            .ok_or_else(|| DerivativeError::SourceUnusable("no filename".into()))?;

        if !force && self.storage.exists(&path) {
            self.stats.hit();
            tracing::debug!(%path, "cache hit");
            return Ok(CachedImage::new(path));
        }

        self.locks
            .with_lock(&path, || {
                // Another request may have generated it while we waited
                if !force && self.storage.exists(&path) {
                    self.stats.hit();
                    tracing::debug!(%path, "generated by a concurrent request");
                    return Ok(());
                }
                tracing::debug!(%path, force, "cache miss");
                self.generate(filename, format, args, &path)
            })
            .inspect_err(|_| self.stats.fail())?;

        Ok(CachedImage::new(path))
    }

    fn usable_filename<'a>(&self, source: &'a dyn ImageSource) -> Result<&'a str, DerivativeError> {
        if !source.has_identity() {
            return Err(DerivativeError::SourceUnusable("image has no identity".into()));
        }
        let filename = source
            .filename()
            .ok_or_else(|| DerivativeError::SourceUnusable("image has no filename".into()))?;
        if !self.storage.exists(filename) {
            return Err(DerivativeError::SourceUnusable(format!("{filename} is missing")));
        }
        Ok(filename)
    }

    fn generate(
        &self,
        source_file: &str,
        format: &str,
        args: &TransformArgs,
        path: &str,
    ) -> Result<(), DerivativeError> {
        let definition = self.registry.resolve(format)?.clone();
        self.backend.check_available()?;

        let backend = Arc::clone(&self.backend);
        let input = self.storage.locate(source_file);
        let target = PathBuf::from(path);
        let job_args = args.clone();
        let encoded = self.run_with_timeout(path, move || -> Result<Option<Vec<u8>>, BackendError> {
            let canvas = backend.open(&input)?;
            match definition.apply(canvas.as_ref(), &job_args) {
                Some(output) => output.encode(&target).map(Some),
                None => Ok(None),
            }
        })??;

        let bytes = encoded.ok_or_else(|| DerivativeError::InvalidArguments {
            format: format.to_string(),
            args: args.clone(),
        })?;

        let write_failure = |source| DerivativeError::WriteFailure {
            path: path.to_string(),
            source,
        };
        if let Some(dir) = parent_dir(path) {
            self.storage.ensure_directory(dir).map_err(write_failure)?;
        }
        self.storage.write(path, &bytes).map_err(write_failure)?;

        self.stats.generate();
        tracing::info!(source = source_file, %path, bytes = bytes.len(), "generated derivative");

        self.update_ledger(|ledger| ledger.record(source_file, path));
        Ok(())
    }

    /// Run `job` on a worker thread, waiting at most the configured timeout.
    ///
    /// On timeout the worker is left to finish on its own; its result is
    /// dropped and nothing is written.
    fn run_with_timeout<T, F>(&self, path: &str, job: F) -> Result<T, DerivativeError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let Some(timeout) = self.timeout else {
            return Ok(job());
        };

        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("resample-worker".into())
            .spawn(move || {
                let _ = tx.send(job());
            })
            .map_err(|e| DerivativeError::Processing(BackendError::Io(e)))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => Err(DerivativeError::Timeout {
                path: path.to_string(),
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(DerivativeError::Processing(
                BackendError::ProcessingFailed("worker panicked".into()),
            )),
        }
    }

    /// Delete every derivative of `source`. Returns the number of files removed.
    ///
    /// Must be called whenever the source's bytes are replaced.
    pub fn invalidate(&self, source: &dyn ImageSource) -> usize {
        let ledger = self.read_ledger();
        let Some(sweep) = self.sweep(source, &ledger) else {
            return 0;
        };
        self.forget_swept(std::slice::from_ref(&sweep));
        sweep.removed
    }

    /// Invalidate every source in parallel. The ledger is read and written
    /// once for the whole batch.
    pub fn flush_all(&self, sources: &[SourceImage]) -> FlushReport {
        let ledger = self.read_ledger();
        let sweeps: Vec<Sweep> = sources
            .par_iter()
            .filter_map(|source| self.sweep(source, &ledger))
            .collect();
        self.forget_swept(&sweeps);
        FlushReport {
            files: sweeps.iter().map(|s| s.removed).sum(),
            sources: sweeps.iter().filter(|s| s.removed > 0).count(),
        }
    }

    /// Delete the derivatives of `source` known from its formats and from
    /// `ledger`. Leaves the ledger itself untouched.
    fn sweep(&self, source: &dyn ImageSource, ledger: &DerivativeLedger) -> Option<Sweep> {
        if source.is_derivative() {
            return None;
        }
        let filename = source.filename()?;

        let none = TransformArgs::none();
        let mut candidates: BTreeSet<String> = self
            .registry
            .list_all()
            .filter_map(|(name, _)| self.cache_path(source, name, &none))
            .collect();
        candidates.extend(ledger.paths_for(filename).map(String::from));

        let mut removed = 0;
        let mut swept = Vec::new();
        for path in candidates {
            match self.locks.with_lock(&path, || self.storage.delete(&path)) {
                Ok(deleted) => {
                    removed += usize::from(deleted);
                    swept.push(path);
                }
                Err(e) => tracing::warn!(%path, error = %e, "could not delete derivative"),
            }
        }

        if removed > 0 {
            tracing::info!(source = filename, removed, "invalidated derivatives");
        }
        Some(Sweep {
            filename: filename.to_string(),
            removed,
            swept,
        })
    }

    /// Drop swept paths from the ledger, except those written again since.
    fn forget_swept(&self, sweeps: &[Sweep]) {
        if sweeps.iter().all(|s| s.swept.is_empty()) {
            return;
        }
        self.update_ledger(|ledger| {
            let mut changed = false;
            for sweep in sweeps {
                for path in &sweep.swept {
                    if !self.storage.exists(path) {
                        changed |= ledger.forget(&sweep.filename, path);
                    }
                }
            }
            changed
        });
    }

    /// Pixel dimensions of `source`, or `None` if it is unusable or unreadable.
    pub fn dimensions(&self, source: &dyn ImageSource) -> Option<Dimensions> {
        let filename = self.usable_filename(source).ok()?;
        self.backend
            .identify(&self.storage.locate(filename))
            .inspect_err(|e| tracing::debug!(filename, error = %e, "could not read dimensions"))
            .ok()
    }

    pub fn width(&self, source: &dyn ImageSource) -> Option<u32> {
        self.dimensions(source).map(|d| d.width)
    }

    pub fn height(&self, source: &dyn ImageSource) -> Option<u32> {
        self.dimensions(source).map(|d| d.height)
    }

    /// `"{width}x{height}"`.
    pub fn dimensions_label(&self, source: &dyn ImageSource) -> Option<String> {
        self.dimensions(source)
            .map(|d| format!("{}x{}", d.width, d.height))
    }

    pub fn orientation(&self, source: &dyn ImageSource) -> Option<Orientation> {
        self.dimensions(source).map(Dimensions::orientation)
    }

    /// `<img>` tag for `source`, only if its file is on storage.
    pub fn tag(&self, source: &dyn ImageSource, base_url: &str) -> Option<Markup> {
        if !self.exists(source) {
            return None;
        }
        render::img_tag(source, base_url)
    }

    /// Current ledger as stored on disk.
    fn read_ledger(&self) -> DerivativeLedger {
        let _guard = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        DerivativeLedger::load(&self.ledger_location())
    }

    /// Re-read the ledger, apply `change`, and save if it reports a change.
    fn update_ledger(&self, change: impl FnOnce(&mut DerivativeLedger) -> bool) {
        let _guard = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.ledger_location();
        let mut ledger = DerivativeLedger::load(&path);
        if change(&mut ledger) {
            if let Err(e) = ledger.save(&path) {
                tracing::warn!(path = %path.display(), error = %e, "could not save derivative ledger");
            }
        }
    }

    /// Absolute path of the ledger file.
    pub fn ledger_location(&self) -> PathBuf {
        self.storage.locate(&ledger_path(&self.assets_dir))
    }
}

impl fmt::Debug for DerivativeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivativeCache")
            .field("assets_dir", &self.assets_dir)
            .field("timeout", &self.timeout)
            .field("formats", &self.registry.len())
            .finish_non_exhaustive()
    }
}
