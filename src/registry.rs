//! Named image transformations ("formats") and their arguments.
//!
//! A format is a name (`SetWidth`, `CMSThumbnail`, …), an arity (how many
//! arguments it takes, 0–2) and a function from an opened [`Canvas`] plus
//! [`TransformArgs`] to a new canvas. The [`TransformRegistry`] is an explicit
//! table built once at startup; there is no discovery by naming convention.
//!
//! ## Built-in formats
//!
//! | Format | Arity | Canvas operation |
//! |---|---|---|
//! | `SetWidth` | 1 | `resize_by_width(w)` |
//! | `SetHeight` | 1 | `resize_by_height(h)` |
//! | `SetSize` | 2 | `padded_resize(w, h)` |
//! | `PaddedImage` | 2 | `padded_resize(w, h)` |
//! | `ResizedImage` | 2 | `resize(w, h)` |
//! | `CroppedImage` | 2 | `cropped_resize(w, h)` |
//! | `CMSThumbnail` | 0 | `padded_resize` to `presets.cms_thumbnail` |
//! | `AssetLibraryPreview` | 0 | `padded_resize` to `presets.asset_preview` |
//! | `AssetLibraryThumbnail` | 0 | `padded_resize` to `presets.asset_thumbnail` |
//! | `StripThumbnail` | 0 | `cropped_resize` to `presets.strip_thumbnail` |
//!
//! A transformation *declines* (returns `None`) when a dimension argument is
//! missing, not a positive integer, or when more arguments are supplied than
//! its arity.

use crate::config::PresetsConfig;
use crate::imaging::Canvas;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// A scalar transformation argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformArg {
    Number(i64),
    Text(String),
}

impl TransformArg {
    /// Interpret as a pixel dimension. Numeric text is accepted.
    pub fn as_dimension(&self) -> Option<u32> {
        let value = match self {
            TransformArg::Number(n) => u32::try_from(*n).ok()?,
            TransformArg::Text(s) => s.trim().parse::<u32>().ok()?,
        };
        (value > 0).then_some(value)
    }
}

/// Rendered exactly as it is concatenated into cache filenames.
impl fmt::Display for TransformArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformArg::Number(n) => write!(f, "{n}"),
            TransformArg::Text(s) => f.write_str(s),
        }
    }
}

/// Integers become [`TransformArg::Number`], anything else stays text.
impl FromStr for TransformArg {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => TransformArg::Number(n),
            Err(_) => TransformArg::Text(s.to_string()),
        })
    }
}

impl From<i32> for TransformArg {
    fn from(value: i32) -> Self {
        TransformArg::Number(value.into())
    }
}

impl From<u32> for TransformArg {
    fn from(value: u32) -> Self {
        TransformArg::Number(value.into())
    }
}

impl From<i64> for TransformArg {
    fn from(value: i64) -> Self {
        TransformArg::Number(value)
    }
}

impl From<&str> for TransformArg {
    fn from(value: &str) -> Self {
        TransformArg::Text(value.to_string())
    }
}

impl From<String> for TransformArg {
    fn from(value: String) -> Self {
        TransformArg::Text(value)
    }
}

/// Up to two positional arguments. Either slot may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformArgs {
    pub arg1: Option<TransformArg>,
    pub arg2: Option<TransformArg>,
}

impl TransformArgs {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn one(arg1: impl Into<TransformArg>) -> Self {
        Self {
            arg1: Some(arg1.into()),
            arg2: None,
        }
    }

    pub fn two(arg1: impl Into<TransformArg>, arg2: impl Into<TransformArg>) -> Self {
        Self {
            arg1: Some(arg1.into()),
            arg2: Some(arg2.into()),
        }
    }

    /// Position of the last supplied argument.
    pub fn len(&self) -> usize {
        if self.arg2.is_some() {
            2
        } else if self.arg1.is_some() {
            1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both slots concatenated, absent ones as the empty string.
    pub fn concat(&self) -> String {
        let render = |arg: &Option<TransformArg>| arg.as_ref().map(|a| a.to_string()).unwrap_or_default();
        format!("{}{}", render(&self.arg1), render(&self.arg2))
    }

    /// First argument as a pixel dimension.
    pub fn first(&self) -> Option<u32> {
        self.arg1.as_ref()?.as_dimension()
    }

    /// Second argument as a pixel dimension.
    pub fn second(&self) -> Option<u32> {
        self.arg2.as_ref()?.as_dimension()
    }
}

impl fmt::Display for TransformArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.arg1, &self.arg2) {
            (None, None) => f.write_str("()"),
            (Some(a), None) => write!(f, "({a})"),
            (a, b) => {
                let show = |arg: &Option<TransformArg>| {
                    arg.as_ref().map(|a| a.to_string()).unwrap_or_else(|| "null".into())
                };
                write!(f, "({}, {})", show(a), show(b))
            }
        }
    }
}

pub type TransformFn =
    dyn Fn(&dyn Canvas, &TransformArgs) -> Option<Box<dyn Canvas>> + Send + Sync;

/// A registered format: name, arity and the transformation itself.
#[derive(Clone)]
pub struct TransformDefinition {
    name: String,
    arity: usize,
    transform: Arc<TransformFn>,
}

impl TransformDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Run the transformation. `None` means it declined to produce output.
    pub fn apply(&self, canvas: &dyn Canvas, args: &TransformArgs) -> Option<Box<dyn Canvas>> {
        if args.len() > self.arity {
            return None;
        }
        (self.transform)(canvas, args)
    }
}

impl fmt::Debug for TransformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformDefinition")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown image format: {0}")]
pub struct UnknownFormat(pub String);

/// Table of available formats, in registration order.
#[derive(Clone, Default, Debug)]
pub struct TransformRegistry {
    definitions: Vec<TransformDefinition>,
    index: HashMap<String, usize>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in formats.
    pub fn with_builtins(presets: &PresetsConfig) -> Self {
        let mut registry = Self::new();

        registry.register("SetWidth", 1, |canvas, args| {
            canvas.resize_by_width(args.first()?)
        });
        registry.register("SetHeight", 1, |canvas, args| {
            canvas.resize_by_height(args.first()?)
        });
        registry.register("SetSize", 2, |canvas, args| {
            canvas.padded_resize(args.first()?, args.second()?)
        });
        registry.register("PaddedImage", 2, |canvas, args| {
            canvas.padded_resize(args.first()?, args.second()?)
        });
        registry.register("ResizedImage", 2, |canvas, args| {
            canvas.resize(args.first()?, args.second()?)
        });
        registry.register("CroppedImage", 2, |canvas, args| {
            canvas.cropped_resize(args.first()?, args.second()?)
        });

        let [w, h] = presets.cms_thumbnail;
        registry.register("CMSThumbnail", 0, move |canvas, _| canvas.padded_resize(w, h));
        let [w, h] = presets.asset_preview;
        registry.register("AssetLibraryPreview", 0, move |canvas, _| {
            canvas.padded_resize(w, h)
        });
        let [w, h] = presets.asset_thumbnail;
        registry.register("AssetLibraryThumbnail", 0, move |canvas, _| {
            canvas.padded_resize(w, h)
        });
        let [w, h] = presets.strip_thumbnail;
        registry.register("StripThumbnail", 0, move |canvas, _| {
            canvas.cropped_resize(w, h)
        });

        registry
    }

    /// Declare a format. Re-registering a name replaces the earlier
    /// definition in place.
    ///
    /// # Panics
    /// If `arity` exceeds 2. That is a startup programming error.
    pub fn register<F>(&mut self, name: &str, arity: usize, transform: F)
    where
        F: Fn(&dyn Canvas, &TransformArgs) -> Option<Box<dyn Canvas>> + Send + Sync + 'static,
    {
        assert!(arity <= 2, "format {name} declares arity {arity}, at most 2 is supported");
        let definition = TransformDefinition {
            name: name.to_string(),
            arity,
            transform: Arc::new(transform),
        };
        match self.index.get(name) {
            Some(&slot) => self.definitions[slot] = definition,
            None => {
                self.index.insert(name.to_string(), self.definitions.len());
                self.definitions.push(definition);
            }
        }
    }

    /// Look up a format by exact name.
    pub fn resolve(&self, name: &str) -> Result<&TransformDefinition, UnknownFormat> {
        self.index
            .get(name)
            .map(|&slot| &self.definitions[slot])
            .ok_or_else(|| UnknownFormat(name.to_string()))
    }

    /// Every registered `(name, arity)`, in registration order.
    pub fn list_all(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.definitions.iter().map(|d| (d.name(), d.arity()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
