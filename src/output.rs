//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## format
//!
//! ```text
//! assets/photo.jpg
//!     SetWidth(100) → assets/_resampled/SetWidth100-photo.jpg
//! ```
//!
//! A request that produced nothing shows `not generated` instead of a path.
//!
//! ## invalidate / flush
//!
//! ```text
//! assets/photo.jpg: 3 removed
//! 3 formatted images from 1 items flushed
//! ```
//!
//! ## info
//!
//! ```text
//! assets/photo.jpg
//!     Size: 200x100
//!     Orientation: landscape
//! ```
//!
//! ## formats
//!
//! ```text
//! Formats
//! 001 SetWidth (1 arg)
//! 007 CMSThumbnail
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::derivative::FlushReport;
use crate::imaging::Dimensions;
use crate::registry::{TransformArgs, TransformRegistry};
use crate::source::CachedImage;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn arity_label(arity: usize) -> String {
    match arity {
        0 => String::new(),
        1 => " (1 arg)".to_string(),
        n => format!(" ({n} args)"),
    }
}

// ============================================================================
// format
// ============================================================================

pub fn format_derivative(
    source: &str,
    format: &str,
    args: &TransformArgs,
    result: Option<&CachedImage>,
) -> Vec<String> {
    let outcome = match result {
        Some(cached) => format!("→ {}", cached.path()),
        None => "not generated".to_string(),
    };
    let request = if args.is_empty() {
        format.to_string()
    } else {
        format!("{format}{args}")
    };
    vec![source.to_string(), format!("    {request} {outcome}")]
}

pub fn print_derivative(source: &str, format: &str, args: &TransformArgs, result: Option<&CachedImage>) {
    for line in format_derivative(source, format, args, result) {
        println!("{}", line);
    }
}

// ============================================================================
// invalidate / flush
// ============================================================================

pub fn format_invalidated(source: &str, removed: usize) -> String {
    format!("{source}: {removed} removed")
}

pub fn format_flush(report: &FlushReport) -> String {
    report.to_string()
}

/// One-line cache summary, omitted when nothing was looked up.
pub fn format_stats(stats: &CacheStats) -> Option<String> {
    (stats.total() > 0).then(|| format!("Cache: {stats}"))
}

// ============================================================================
// info
// ============================================================================

pub fn format_info(source: &str, dimensions: Option<Dimensions>) -> Vec<String> {
    let mut lines = vec![source.to_string()];
    match dimensions {
        Some(d) => {
            lines.push(format!("    Size: {}x{}", d.width, d.height));
            lines.push(format!("    Orientation: {}", d.orientation()));
        }
        None => lines.push("    Unreadable".to_string()),
    }
    lines
}

pub fn print_info(source: &str, dimensions: Option<Dimensions>) {
    for line in format_info(source, dimensions) {
        println!("{}", line);
    }
}

// ============================================================================
// formats
// ============================================================================

pub fn format_formats(registry: &TransformRegistry) -> Vec<String> {
    let mut lines = vec!["Formats".to_string()];
    lines.extend(
        registry
            .list_all()
            .enumerate()
            .map(|(i, (name, arity))| {
                format!("{} {}{}", format_index(i + 1), name, arity_label(arity))
            }),
    );
    lines
}

pub fn print_formats(registry: &TransformRegistry) {
    for line in format_formats(registry) {
        println!("{}", line);
    }
}
