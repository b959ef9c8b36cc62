//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize by width / height / exact | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Padded resize | `DynamicImage::resize` + `imageops::overlay` on a filled canvas |
//! | Cropped resize | `DynamicImage::resize_to_fill` |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode PNG, GIF, WebP | `DynamicImage::write_to` |
//!
//! Every operation computes its output size first and declines when either
//! side is zero or above the backend's maximum dimension, so no buffer is
//! allocated for an absurd request.

use super::backend::{BackendError, Canvas, Dimensions, ImageBackend};
use super::calculations::{center_offset, fit_within, scale_to_height, scale_to_width};
use super::params::{PadColor, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

/// Largest output width or height unless configured otherwise.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    quality: Quality,
    pad_color: PadColor,
    max_dimension: u32,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_output(Quality::default(), PadColor::default())
    }

    pub fn with_output(quality: Quality, pad_color: PadColor) -> Self {
        Self {
            quality,
            pad_color,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded image plus the output settings it will be encoded with.
struct RustCanvas {
    image: DynamicImage,
    quality: Quality,
    pad_color: PadColor,
    max_dimension: u32,
}

impl RustCanvas {
    fn derive(&self, image: DynamicImage) -> Option<Box<dyn Canvas>> {
        Some(Box::new(RustCanvas {
            image,
            quality: self.quality,
            pad_color: self.pad_color,
            max_dimension: self.max_dimension,
        }))
    }

    fn size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// `Some(size)` if an output of that size may be produced.
    fn target(&self, (width, height): (u32, u32)) -> Option<(u32, u32)> {
        let limit = 1..=self.max_dimension;
        (limit.contains(&width) && limit.contains(&height)).then_some((width, height))
    }
}

impl Canvas for RustCanvas {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    fn resize_by_width(&self, width: u32) -> Option<Box<dyn Canvas>> {
        if width == 0 {
            return None;
        }
        let (w, h) = self.target(scale_to_width(self.size(), width))?;
        self.derive(self.image.resize_exact(w, h, FilterType::Lanczos3))
    }

    fn resize_by_height(&self, height: u32) -> Option<Box<dyn Canvas>> {
        if height == 0 {
            return None;
        }
        let (w, h) = self.target(scale_to_height(self.size(), height))?;
        self.derive(self.image.resize_exact(w, h, FilterType::Lanczos3))
    }

    fn resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>> {
        let (width, height) = self.target((width, height))?;
        self.derive(self.image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn padded_resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>> {
        let (width, height) = self.target((width, height))?;
        let (fit_w, fit_h) = fit_within(self.size(), (width, height));
        let fitted = self
            .image
            .resize_exact(fit_w, fit_h, FilterType::Lanczos3)
            .to_rgba8();

        let mut padded = RgbaImage::from_pixel(width, height, Rgba(self.pad_color.rgba()));
        let (x, y) = center_offset((fit_w, fit_h), (width, height));
        image::imageops::overlay(&mut padded, &fitted, x as i64, y as i64);
        self.derive(DynamicImage::ImageRgba8(padded))
    }

    fn cropped_resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>> {
        let (width, height) = self.target((width, height))?;
        self.derive(self.image.resize_to_fill(width, height, FilterType::Lanczos3))
    }

    fn encode(&self, target: &Path) -> Result<Vec<u8>, BackendError> {
        let format = ImageFormat::from_path(target).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Unsupported output format for {}: {}",
                target.display(),
                e
            ))
        })?;

        let mut bytes = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality.value() as u8);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
            }
            other => {
                self.image
                    .write_to(&mut Cursor::new(&mut bytes), other)
                    .map_err(|e| {
                        BackendError::ProcessingFailed(format!("{other:?} encode failed: {e}"))
                    })?;
            }
        }
        Ok(bytes)
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Canvas>, BackendError> {
        if !is_supported(path) {
            return Err(BackendError::Unavailable(format!(
                "no decoder for {}",
                path.display()
            )));
        }
        let image = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to decode {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Box::new(RustCanvas {
            image,
            quality: self.quality,
            pad_color: self.pad_color,
            max_dimension: self.max_dimension,
        }))
    }
}
