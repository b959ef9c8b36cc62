//! Resampler configuration.
//!
//! Handles loading, merging, and validating the `resampler.toml` file. User
//! values are merged over the stock defaults, so a config file only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! assets_dir = "assets"         # Parent folder of images without a folder
//!
//! [presets]
//! strip_thumbnail = [50, 50]    # StripThumbnail (cropped)
//! cms_thumbnail = [100, 100]    # CMSThumbnail (padded)
//! asset_thumbnail = [100, 100]  # AssetLibraryThumbnail (padded)
//! asset_preview = [400, 200]    # AssetLibraryPreview (padded)
//!
//! [output]
//! quality = 90                  # JPEG quality (1-100)
//! pad_color = [255, 255, 255]   # Fill for padded resizes
//!
//! [processing]
//! timeout_secs = 30             # Per-derivative limit, 0 = wait forever
//! max_dimension = 8192          # Largest output width or height
//! max_processes = 4             # Bulk workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `resampler.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleConfig {
    /// Root assets directory, relative to the storage root.
    pub assets_dir: String,
    /// Sizes of the argument-less thumbnail formats.
    pub presets: PresetsConfig,
    /// Encoding settings for generated files.
    pub output: OutputConfig,
    /// Timeout and parallelism.
    pub processing: ProcessingConfig,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            assets_dir: "assets".to_string(),
            presets: PresetsConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ResampleConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assets_dir.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "assets_dir must not be empty".into(),
            ));
        }
        for (name, [w, h]) in self.presets.named() {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(format!(
                    "presets.{name} values must be non-zero"
                )));
            }
        }
        if self.processing.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "processing.max_dimension must be non-zero".into(),
            ));
        }
        for (name, [w, h]) in self.presets.named() {
            if w.max(h) > self.processing.max_dimension {
                return Err(ConfigError::Validation(format!(
                    "presets.{name} exceeds processing.max_dimension"
                )));
            }
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Assets directory without surrounding slashes.
    pub fn assets_root(&self) -> &str {
        self.assets_dir.trim_matches('/')
    }
}

/// Sizes for the built-in argument-less formats, as `[width, height]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetsConfig {
    pub strip_thumbnail: [u32; 2],
    pub cms_thumbnail: [u32; 2],
    pub asset_thumbnail: [u32; 2],
    pub asset_preview: [u32; 2],
}

impl Default for PresetsConfig {
    fn default() -> Self {
        Self {
            strip_thumbnail: [50, 50],
            cms_thumbnail: [100, 100],
            asset_thumbnail: [100, 100],
            asset_preview: [400, 200],
        }
    }
}

impl PresetsConfig {
    fn named(&self) -> [(&'static str, [u32; 2]); 4] {
        [
            ("strip_thumbnail", self.strip_thumbnail),
            ("cms_thumbnail", self.cms_thumbnail),
            ("asset_thumbnail", self.asset_thumbnail),
            ("asset_preview", self.asset_preview),
        ]
    }
}

/// Encoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG encoding quality (1-100).
    pub quality: u32,
    /// RGB fill for the borders of padded resizes.
    pub pad_color: [u8; 3],
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            pad_color: [255, 255, 255],
        }
    }
}

/// Processing limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Seconds a single derivative may take to produce. `0` disables the limit.
    pub timeout_secs: u64,
    /// Largest width or height a derivative may have. Larger requests
    /// produce no output.
    pub max_dimension: u32,
    /// Maximum number of parallel workers for bulk operations.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_dimension: 8192,
            max_processes: None,
        }
    }
}

impl ProcessingConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ResampleConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ResampleConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ResampleConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the stock defaults; an unreadable or invalid one
/// is an error.
pub fn load_config(path: &Path) -> Result<ResampleConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `resampler.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Resampler Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Assets directory, relative to the storage root. Images stored directly in
# it have no parent folder, so their derivatives land in
# <assets_dir>/_resampled/.
assets_dir = "assets"

# ---------------------------------------------------------------------------
# Built-in thumbnail formats, as [width, height]
# ---------------------------------------------------------------------------
[presets]
# StripThumbnail: cropped to fill exactly.
strip_thumbnail = [50, 50]

# CMSThumbnail: padded to fit.
cms_thumbnail = [100, 100]

# AssetLibraryThumbnail: padded to fit.
asset_thumbnail = [100, 100]

# AssetLibraryPreview: padded to fit.
asset_preview = [400, 200]

# ---------------------------------------------------------------------------
# Encoding of generated files
# ---------------------------------------------------------------------------
[output]
# JPEG quality (1 = worst, 100 = best). Other formats are lossless.
quality = 90

# Fill color [r, g, b] for the borders added by padded resizes.
pad_color = [255, 255, 255]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Seconds a single derivative may take before the request gives up on it.
# 0 waits forever.
timeout_secs = 30

# Largest width or height of a generated file. Requests for anything bigger
# produce nothing instead of exhausting memory.
max_dimension = 8192

# Maximum parallel workers for bulk flushes. Omit to use all CPU cores.
# max_processes = 4
"##
}
