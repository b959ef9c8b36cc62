//! Cache filename convention for derivatives.
//!
//! Every derivative lives in a `_resampled/` directory beside its source's
//! folder, named by the format, its arguments and the source's base name:
//!
//! ```text
//! {folder}/_resampled/{format}{arg1}{arg2}-{base_name}
//! ```
//!
//! - `folder` is the source's parent folder, or the assets root for images
//!   without one.
//! - Arguments are concatenated verbatim, absent ones as the empty string.
//!   `SetWidth(100)` → `SetWidth100-photo.jpg`, `SetSize(100, 50)` →
//!   `SetSize10050-photo.jpg`.
//!
//! The concatenation has no separator, so `Resize(100, None)` and
//! `Resize(100, "")` share a path, as do `SetSize(10, 050)` and
//! `SetSize(100, 50)`. Existing caches on disk depend on this layout.
//!
//! Everything here is pure string work: no I/O.

use crate::registry::TransformArgs;
use crate::source::ImageSource;

/// Directory name that holds derivatives inside a folder.
pub const RESAMPLED_DIR: &str = "_resampled";

/// Build a cache path from its parts.
///
/// ```
/// # use resampler::naming::cache_filename;
/// # use resampler::registry::TransformArgs;
/// assert_eq!(
///     cache_filename("assets/Uploads/", "photo.jpg", "SetWidth", &TransformArgs::one(100)),
///     "assets/Uploads/_resampled/SetWidth100-photo.jpg"
/// );
/// ```
pub fn cache_filename(folder: &str, base_name: &str, format: &str, args: &TransformArgs) -> String {
    let folder = folder.trim_end_matches('/');
    let key = format!("{format}{}", args.concat());
    if folder.is_empty() {
        format!("{RESAMPLED_DIR}/{key}-{base_name}")
    } else {
        format!("{folder}/{RESAMPLED_DIR}/{key}-{base_name}")
    }
}

/// Cache path for `source`, or `None` if it has no filename.
pub fn cache_path_for(
    source: &dyn ImageSource,
    assets_dir: &str,
    format: &str,
    args: &TransformArgs,
) -> Option<String> {
    let base_name = source.base_name()?;
    let folder = source.parent_folder().unwrap_or(assets_dir);
    Some(cache_filename(folder, base_name, format, args))
}
