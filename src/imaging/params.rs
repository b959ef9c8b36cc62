//! Output parameters shared by every backend.
//!
//! These values describe *how* a derivative is encoded, not which
//! transformation produced it. They come from the `[output]` section of the
//! config and are handed to the backend once, at construction.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`PadColor`]: Fill color for the borders added by a padded resize (default white).

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// RGB fill used for the letterbox bars of a padded resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadColor(pub [u8; 3]);

impl PadColor {
    pub fn white() -> Self {
        Self([255, 255, 255])
    }

    pub fn rgba(self) -> [u8; 4] {
        let [r, g, b] = self.0;
        [r, g, b, 255]
    }
}

impl Default for PadColor {
    fn default() -> Self {
        Self::white()
    }
}
