//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Backends use them so that every implementation (including the test mock)
//! agrees on output sizes.

use std::fmt;

/// Orientation of an image, derived from its pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Square,
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Orientation::Square => "square",
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        };
        f.write_str(label)
    }
}

/// Classify dimensions. Equal sides are square.
pub fn orientation(width: u32, height: u32) -> Orientation {
    if width > height {
        Orientation::Landscape
    } else if height > width {
        Orientation::Portrait
    } else {
        Orientation::Square
    }
}

/// Scale to an exact width, keeping the aspect ratio.
///
/// The derived height never collapses below one pixel.
///
/// # Examples
/// ```
/// # use resampler::imaging::calculations::scale_to_width;
/// assert_eq!(scale_to_width((200, 100), 100), (100, 50));
/// ```
pub fn scale_to_width(source: (u32, u32), width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let h = (width as f64 * src_h as f64 / src_w.max(1) as f64).round() as u32;
    (width, h.max(1))
}

/// Scale to an exact height, keeping the aspect ratio.
pub fn scale_to_height(source: (u32, u32), height: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    let w = (height as f64 * src_w as f64 / src_h.max(1) as f64).round() as u32;
    (w.max(1), height)
}

/// Largest aspect-preserving size that fits inside `bounds`.
///
/// One dimension matches the bound exactly; the other is at most its bound.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    let src_aspect = src_w as f64 / src_h.max(1) as f64;
    let max_aspect = max_w as f64 / max_h.max(1) as f64;

    if src_aspect > max_aspect {
        // Wider than the box: width is the limit
        scale_to_width(source, max_w)
    } else {
        scale_to_height(source, max_h)
    }
}

/// Offset that centers `inner` inside `outer`.
pub fn center_offset(inner: (u32, u32), outer: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // orientation
    // =========================================================================

    #[test]
    fn wider_is_landscape() {
        assert_eq!(orientation(201, 200), Orientation::Landscape);
    }

    #[test]
    fn taller_is_portrait() {
        assert_eq!(orientation(200, 201), Orientation::Portrait);
    }

    #[test]
    fn equal_sides_are_square() {
        assert_eq!(orientation(200, 200), Orientation::Square);
        assert_eq!(orientation(0, 0), Orientation::Square);
    }

    #[test]
    fn orientation_display() {
        assert_eq!(Orientation::Landscape.to_string(), "landscape");
        assert_eq!(Orientation::Portrait.to_string(), "portrait");
        assert_eq!(Orientation::Square.to_string(), "square");
    }

    // =========================================================================
    // scaling
    // =========================================================================

    #[test]
    fn scale_to_width_halves_landscape() {
        assert_eq!(scale_to_width((200, 100), 100), (100, 50));
    }

    #[test]
    fn scale_to_width_upscales() {
        assert_eq!(scale_to_width((100, 50), 300), (300, 150));
    }

    #[test]
    fn scale_to_width_rounds() {
        // 333 * 100 / 1000 = 33.3
        assert_eq!(scale_to_width((1000, 100), 333), (333, 33));
    }

    #[test]
    fn scale_to_width_never_zero_height() {
        assert_eq!(scale_to_width((1000, 1), 10), (10, 1));
    }

    #[test]
    fn scale_to_height_portrait() {
        assert_eq!(scale_to_height((600, 800), 400), (300, 400));
    }

    // =========================================================================
    // fit_within / center_offset
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_within((200, 100), (100, 100)), (100, 50));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_within((100, 200), (100, 100)), (50, 100));
    }

    #[test]
    fn fit_same_aspect_matches_bounds() {
        assert_eq!(fit_within((800, 400), (400, 200)), (400, 200));
    }

    #[test]
    fn center_offset_letterbox() {
        assert_eq!(center_offset((100, 50), (100, 100)), (0, 25));
    }

    #[test]
    fn center_offset_never_negative() {
        assert_eq!(center_offset((120, 50), (100, 100)), (0, 25));
    }
}
