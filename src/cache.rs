//! Bookkeeping for generated derivatives.
//!
//! Cache paths are deterministic, so a derivative can always be found again
//! from its source, format and arguments. The reverse is not true: given only
//! a source, the set of `(format, args)` pairs that were ever requested is
//! unknown. Invalidation needs that set.
//!
//! [`DerivativeLedger`] records it. Each successful generation adds the
//! cache path under its source's filename; an invalidation sweep deletes
//! the recorded paths and forgets exactly the ones it swept.
//!
//! Several processes may share one assets root, so the file on disk is the
//! ledger. Every change re-reads it, applies the change and writes it back
//! through a staging file.
//!
//! ## Storage
//!
//! The ledger is a JSON file at `{assets}/_resampled/.derivatives.json`. It
//! is advisory: a missing, corrupt or outdated ledger loads as empty, and
//! sweeps still cover each format's zero-argument path without it.
//!
//! [`CacheStats`] counts what the cache did during one process's lifetime.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::naming::RESAMPLED_DIR;

/// Name of the ledger file inside the assets root's `_resampled/` directory.
pub const LEDGER_FILENAME: &str = ".derivatives.json";

/// Bump to discard ledgers written by an incompatible version.
const LEDGER_VERSION: u32 = 1;

/// Source filename → cache paths generated from it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DerivativeLedger {
    pub version: u32,
    pub sources: BTreeMap<String, BTreeSet<String>>,
}

impl Default for DerivativeLedger {
    fn default() -> Self {
        Self::empty()
    }
}

impl DerivativeLedger {
    pub fn empty() -> Self {
        Self {
            version: LEDGER_VERSION,
            sources: BTreeMap::new(),
        }
    }

    /// Load from `path`. Returns an empty ledger if the file doesn't exist
    /// or can't be parsed.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::empty();
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(ledger) if ledger.version == LEDGER_VERSION => ledger,
            Ok(ledger) => {
                tracing::debug!(
                    found = ledger.version,
                    expected = LEDGER_VERSION,
                    "discarding derivative ledger with a different version"
                );
                Self::empty()
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "discarding unreadable derivative ledger");
                Self::empty()
            }
        }
    }

    /// Save to `path`, creating its directory if needed. Readers never see
    /// a half-written file.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let staging = path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, path).inspect_err(|_| {
            let _ = std::fs::remove_file(&staging);
        })
    }

    /// Record that `cache_path` was generated from `source`. Returns `false`
    /// if it was already known.
    pub fn record(&mut self, source: &str, cache_path: &str) -> bool {
        self.sources
            .entry(source.to_string())
            .or_default()
            .insert(cache_path.to_string())
    }

    /// Every recorded cache path for `source`.
    pub fn paths_for(&self, source: &str) -> impl Iterator<Item = &str> {
        self.sources
            .get(source)
            .into_iter()
            .flat_map(|paths| paths.iter().map(String::as_str))
    }

    /// Drop one recorded path. A source with nothing left is removed.
    pub fn forget(&mut self, source: &str, cache_path: &str) -> bool {
        let Some(paths) = self.sources.get_mut(source) else {
            return false;
        };
        let removed = paths.remove(cache_path);
        if paths.is_empty() {
            self.sources.remove(source);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Relative path of the ledger for an assets root, e.g.
/// `assets/_resampled/.derivatives.json`.
pub fn ledger_path(assets_root: &str) -> String {
    let root = assets_root.trim_matches('/');
    if root.is_empty() {
        format!("{RESAMPLED_DIR}/{LEDGER_FILENAME}")
    } else {
        format!("{root}/{RESAMPLED_DIR}/{LEDGER_FILENAME}")
    }
}

/// Counters for cache lookups, shared across threads.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU32,
    generated: AtomicU32,
    failed: AtomicU32,
}

impl CacheStats {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generate(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fail(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn generated(&self) -> u32 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u32 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u32 {
        self.hits() + self.generated() + self.failed()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hits, generated, failed) = (self.hits(), self.generated(), self.failed());
        if failed > 0 {
            write!(
                f,
                "{hits} cached, {generated} generated, {failed} failed ({} total)",
                self.total()
            )
        } else if hits > 0 {
            write!(f, "{hits} cached, {generated} generated ({} total)", self.total())
        } else {
            write!(f, "{generated} generated")
        }
    }
}
