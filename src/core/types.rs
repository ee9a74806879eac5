//! Values carried along graph edges and stored as node parameters.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A value on a port or in a parameter slot.
///
/// Images never appear in parameter tables, so they are skipped by serde;
/// serializing one is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    #[serde(skip)]
    Image(ImageValue),
    Float(f64),
    Integer(i64),
    String(String),
}

/// The kind of value a port or parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Image,
    Float,
    Integer,
    String,
    /// Proxies accept whatever they are given.
    Any,
}

impl Value {
    pub fn port_type(&self) -> PortType {
        match self {
            Value::Image(_) => PortType::Image,
            Value::Float(_) => PortType::Float,
            Value::Integer(_) => PortType::Integer,
            Value::String(_) => PortType::String,
        }
    }

    pub fn as_image(&self) -> Option<&ImageValue> {
        match self {
            Value::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            Value::Integer(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Image(image) => {
                let (width, height) = image.dimensions();
                write!(f, "<image {}x{}>", width, height)
            }
            Value::Float(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl PortType {
    /// Whether `value` may be stored in a slot of this type.
    pub fn matches(self, value: &Value) -> bool {
        self.accepts(value.port_type())
    }

    /// Whether an output of type `source` may feed an input of this type.
    pub fn accepts(self, source: PortType) -> bool {
        self == source
            || self == PortType::Any
            || source == PortType::Any
            || (self == PortType::Float && source == PortType::Integer)
    }

    pub fn name(self) -> &'static str {
        match self {
            PortType::Image => "image",
            PortType::Float => "float",
            PortType::Integer => "integer",
            PortType::String => "string",
            PortType::Any => "any",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded image.
///
/// Clones share one pixel buffer. Two values compare equal only when they
/// share it, which is what the pass-through checks rely on.
#[derive(Debug, Clone)]
pub struct ImageValue {
    pixels: Arc<DynamicImage>,
    source: Option<PathBuf>,
}

impl ImageValue {
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
            source: None,
        }
    }

    /// Decode the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> image::ImageResult<Self> {
        let path = path.as_ref();
        Ok(Self {
            pixels: Arc::new(image::open(path)?),
            source: Some(path.to_path_buf()),
        })
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }

    /// The file this image was decoded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Container format guessed from the source file's extension.
    pub fn format(&self) -> Option<image::ImageFormat> {
        self.source
            .as_deref()
            .and_then(|path| image::ImageFormat::from_path(path).ok())
    }

    pub fn shares_pixels(&self, other: &ImageValue) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl PartialEq for ImageValue {
    fn eq(&self, other: &Self) -> bool {
        self.shares_pixels(other)
    }
}
