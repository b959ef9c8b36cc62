//! # Resampler
//!
//! On-demand image derivatives backed by a deterministic file cache.
//! A derivative (a resized, padded or cropped variant of a stored image) is
//! generated the first time it is requested, written next to its source, and
//! served from disk from then on until the source is invalidated.
//!
//! # Architecture
//!
//! ```text
//! request(source, format, args, force)
//!     │
//!     ├─ naming     → {folder}/_resampled/{format}{arg1}{arg2}-{name}
//!     ├─ storage    → exists? ── hit ──▶ CachedImage
//!     │
//!     ├─ registry   → format name → transformation
//!     ├─ imaging    → open → transform → encode
//!     └─ storage    → write ──▶ CachedImage
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`derivative`] | The get-or-generate cache, invalidation sweeps, dimension queries |
//! | [`registry`] | Named formats, their arity, and the built-in set |
//! | [`naming`] | The `_resampled/` cache path convention |
//! | [`source`] | Originals ([`source::SourceImage`]) and derivatives ([`source::CachedImage`]) |
//! | [`storage`] | Relative-path storage; [`storage::FsStorage`] on the local filesystem |
//! | [`cache`] | Ledger of generated paths per source; hit/miss statistics |
//! | [`locks`] | Per-cache-path mutual exclusion |
//! | [`imaging`] | Backend trait and the pure-Rust `image` crate backend |
//! | [`render`] | URLs and `<img>` tags via Maud |
//! | [`config`] | `resampler.toml` loading, merging, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Path Is the Cache Key
//!
//! Nothing about a derivative is stored besides the file itself. Two requests
//! for the same source, format and arguments always compute the same path, so
//! "is it cached?" is a single existence check. The concatenation has no
//! separator, so `Resize(100, None)` and `Resize(100, "")` share a file;
//! directories written by earlier versions depend on this layout.
//!
//! ## Explicit Format Table
//!
//! Formats are registered by name into a [`registry::TransformRegistry`] at
//! startup. Sizes of the argument-less thumbnails come from the `[presets]`
//! config section rather than process-wide globals.
//!
//! ## Degrade, Don't Fail
//!
//! An unknown format, a missing source, an unavailable backend or a failed
//! write never aborts the caller. [`derivative::DerivativeCache::get_formatted`]
//! logs the reason with `tracing` and returns `None`, leaving it to the page
//! to show nothing, the original, or a placeholder.
//!
//! ## Sweeping Argumented Derivatives
//!
//! Cache paths can be recomputed for formats without arguments, but not for
//! `SetWidth(150)` unless someone remembers that 150 was requested. A small
//! JSON ledger records every generated path per source so invalidation
//! removes those too.

pub mod cache;
pub mod config;
pub mod derivative;
pub mod imaging;
pub mod locks;
pub mod naming;
pub mod output;
pub mod registry;
pub mod render;
pub mod source;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
