//! Image processing backend trait and shared types.
//!
//! The derivative cache never touches pixels itself. It asks an
//! [`ImageBackend`] to open a source file, which yields a [`Canvas`]: an
//! opened image supporting the five primitive operations every
//! transformation is built from (resize by width, resize by height, exact
//! resize, padded resize, cropped resize) plus encoding.
//!
//! Each operation returns a *new* canvas, or `None` when the backend declines
//! (for example a zero target dimension). Declining is not an error; the
//! caller reports it as "no output produced".
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::calculations::{Orientation, orientation};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn orientation(self) -> Orientation {
        orientation(self.width, self.height)
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// An opened image held by a backend.
///
/// `Send` so that generation can run on a worker thread under a timeout.
pub trait Canvas: Send {
    fn dimensions(&self) -> Dimensions;

    /// Resize to `width`, keeping the aspect ratio.
    fn resize_by_width(&self, width: u32) -> Option<Box<dyn Canvas>>;

    /// Resize to `height`, keeping the aspect ratio.
    fn resize_by_height(&self, height: u32) -> Option<Box<dyn Canvas>>;

    /// Resize to exactly `width` x `height`, ignoring the aspect ratio.
    fn resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>>;

    /// Fit inside `width` x `height` and pad the remainder.
    fn padded_resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>>;

    /// Fill `width` x `height` and center-crop the overflow.
    fn cropped_resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>>;

    /// Encode for `target`; the output format follows its extension.
    fn encode(&self, target: &Path) -> Result<Vec<u8>, BackendError>;
}

/// Trait for image processing backends.
pub trait ImageBackend: Send + Sync {
    /// Report whether the backend can process images at all.
    ///
    /// Backends relying on an optional capability (a system library, a
    /// feature flag) return [`BackendError::Unavailable`] here.
    fn check_available(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Get image dimensions without decoding the whole file.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Open an image for processing.
    fn open(&self, path: &Path) -> Result<Box<dyn Canvas>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::{scale_to_height, scale_to_width};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock backend that records operations without touching pixels.
    ///
    /// Every canvas it opens reports `dimensions`; encoding produces the
    /// bytes `"{width}x{height}"` so tests can assert on output size by
    /// reading the cached file back.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub available: bool,
        pub delay: Option<Duration>,
        pub operations: Arc<Mutex<Vec<RecordedOp>>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Open(String),
        ResizeByWidth(u32),
        ResizeByHeight(u32),
        Resize(u32, u32),
        PaddedResize(u32, u32),
        CroppedResize(u32, u32),
        Encode(String),
    }

    impl MockBackend {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                dimensions: Dimensions::new(width, height),
                available: true,
                delay: None,
                operations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new(1, 1)
            }
        }

        pub fn slow(width: u32, height: u32, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(width, height)
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Number of times a source was opened, i.e. generations attempted.
        pub fn open_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Open(_)))
                .count()
        }
    }

    struct MockCanvas {
        dimensions: Dimensions,
        operations: Arc<Mutex<Vec<RecordedOp>>>,
    }

    impl MockCanvas {
        fn derive(&self, op: RecordedOp, size: (u32, u32)) -> Option<Box<dyn Canvas>> {
            self.operations.lock().unwrap().push(op);
            if size.0 == 0 || size.1 == 0 {
                return None;
            }
            Some(Box::new(MockCanvas {
                dimensions: Dimensions::new(size.0, size.1),
                operations: Arc::clone(&self.operations),
            }))
        }
    }

    impl Canvas for MockCanvas {
        fn dimensions(&self) -> Dimensions {
            self.dimensions
        }

        fn resize_by_width(&self, width: u32) -> Option<Box<dyn Canvas>> {
            let size = if width == 0 {
                (0, 0)
            } else {
                scale_to_width(self.dimensions.as_tuple(), width)
            };
            self.derive(RecordedOp::ResizeByWidth(width), size)
        }

        fn resize_by_height(&self, height: u32) -> Option<Box<dyn Canvas>> {
            let size = if height == 0 {
                (0, 0)
            } else {
                scale_to_height(self.dimensions.as_tuple(), height)
            };
            self.derive(RecordedOp::ResizeByHeight(height), size)
        }

        fn resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>> {
            self.derive(RecordedOp::Resize(width, height), (width, height))
        }

        fn padded_resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>> {
            self.derive(RecordedOp::PaddedResize(width, height), (width, height))
        }

        fn cropped_resize(&self, width: u32, height: u32) -> Option<Box<dyn Canvas>> {
            self.derive(RecordedOp::CroppedResize(width, height), (width, height))
        }

        fn encode(&self, target: &Path) -> Result<Vec<u8>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Encode(target.to_string_lossy().to_string()));
            Ok(format!("{}x{}", self.dimensions.width, self.dimensions.height).into_bytes())
        }
    }

    impl ImageBackend for MockBackend {
        fn check_available(&self) -> Result<(), BackendError> {
            if self.available {
                Ok(())
            } else {
                Err(BackendError::Unavailable("mock backend disabled".into()))
            }
        }

        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            Ok(self.dimensions)
        }

        fn open(&self, path: &Path) -> Result<Box<dyn Canvas>, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Open(path.to_string_lossy().to_string()));
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            Ok(Box::new(MockCanvas {
                dimensions: self.dimensions,
                operations: Arc::clone(&self.operations),
            }))
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::new(800, 600);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result, Dimensions::new(800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_canvas_chains_operations() {
        let backend = MockBackend::new(200, 100);

        let canvas = backend.open(Path::new("/photo.jpg")).unwrap();
        let resized = canvas.resize_by_width(100).unwrap();
        assert_eq!(resized.dimensions(), Dimensions::new(100, 50));

        let bytes = resized.encode(Path::new("/out.jpg")).unwrap();
        assert_eq!(bytes, b"100x50");

        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Open("/photo.jpg".into()),
                RecordedOp::ResizeByWidth(100),
                RecordedOp::Encode("/out.jpg".into()),
            ]
        );
    }

    #[test]
    fn mock_declines_zero_dimensions() {
        let backend = MockBackend::new(200, 100);
        let canvas = backend.open(Path::new("/photo.jpg")).unwrap();
        assert!(canvas.resize_by_width(0).is_none());
        assert!(canvas.padded_resize(0, 10).is_none());
    }

    #[test]
    fn unavailable_mock_reports_unavailable() {
        let backend = MockBackend::unavailable();
        assert!(matches!(
            backend.check_available(),
            Err(BackendError::Unavailable(_))
        ));
    }

    #[test]
    fn dimensions_orientation() {
        assert_eq!(
            Dimensions::new(200, 100).orientation(),
            Orientation::Landscape
        );
        assert_eq!(Dimensions::new(10, 10).orientation(), Orientation::Square);
    }
}
