//! Image processing: the pixel engine the derivative cache orchestrates.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize by width / height** | `resize_exact` with Lanczos3 |
//! | **Padded resize** | fit + `imageops::overlay` on a filled canvas |
//! | **Cropped resize** | `resize_to_fill` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Output settings (quality, pad color)
//! - **Backend**: [`ImageBackend`] + [`Canvas`] traits, and [`RustBackend`]

pub mod backend;
pub mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Canvas, Dimensions, ImageBackend};
pub use calculations::Orientation;
pub use params::{PadColor, Quality};
pub use rust_backend::{RustBackend, supported_input_extensions};
