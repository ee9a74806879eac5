//! Image I/O filters: LoadImage, SaveImage

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::{Constraint, ParameterDefinition, PortDefinition, UiHint};
use crate::core::types::{ImageValue, PortType, Value};
use crate::filters::registry::FilterRegistry;
use std::path::Path;

const EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "tif", "tiff", "webp"];

/// Register I/O filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(|| Box::new(LoadImage));
    registry.register(|| Box::new(SaveImage));
}

fn path_parameter(description: &str) -> ParameterDefinition {
    ParameterDefinition::new("path", PortType::String, Value::String(String::new()))
        .with_description(description)
        .with_ui_hint(UiHint::FileChooser {
            filters: EXTENSIONS.iter().map(|e| format!("*.{}", e)).collect(),
        })
        .with_constraint(Constraint::NotEmpty)
}

fn check_extension(ctx: &ValidationContext, path: &str) -> Result<(), ValidationError> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::CustomValidation {
            node_id: ctx.node_id,
            error: format!("Unsupported image format: '{}'", extension),
        });
    }
    Ok(())
}

/// Loads an image from disk.
#[derive(Debug, Clone)]
pub struct LoadImage;

impl LoadImage {
    pub const ID: &'static str = "metaops:load-image";
}

impl FilterNode for LoadImage {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder(Self::ID, "Load Image")
            .description("Load an image from a file path")
            .category(Category::Input)
            .output(PortDefinition::output("output", PortType::Image).with_description("The loaded image"))
            .parameter(path_parameter("Path to the image file"))
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        let path = ctx.get_string("path")?;
        check_extension(ctx, path)?;

        if !Path::new(path).exists() {
            return Err(ValidationError::CustomValidation {
                node_id: ctx.node_id,
                error: format!("File not found: {}", path),
            });
        }
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let path = ctx.get_string("path")?.to_string();

        let image = ImageValue::open(&path).map_err(|e| ExecutionError::NodeExecution {
            node_id: ctx.node_id,
            error: format!("Failed to load '{}': {}", path, e),
        })?;
        let (width, height) = image.dimensions();
        log::debug!("loaded {} ({}x{})", path, width, height);

        ctx.set_output("output", Value::Image(image))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

/// Saves an image to disk, creating parent directories as needed.
///
/// The encoder is picked from the file extension. JPEG has no alpha
/// channel, so it is written as 8-bit RGB; everything else as 8-bit RGBA.
#[derive(Debug, Clone)]
pub struct SaveImage;

impl SaveImage {
    pub const ID: &'static str = "metaops:save-image";
}

impl FilterNode for SaveImage {
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::builder(Self::ID, "Save Image")
            .description("Save an image to a file")
            .category(Category::Output)
            .input(PortDefinition::input("input", PortType::Image).with_description("The image to save"))
            .output(
                PortDefinition::output("path", PortType::String)
                    .with_description("The path the image was written to"),
            )
            .parameter(path_parameter("Destination file; the extension selects the format"))
            .build()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        let path = ctx.get_string("path")?;
        check_extension(ctx, path)
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let node_id = ctx.node_id;
        let path = ctx.get_string("path")?.to_string();
        let image = ctx.get_input_image("input")?;
        let data = image.pixels();

        let failed = |e: &dyn std::fmt::Display| ExecutionError::NodeExecution {
            node_id,
            error: format!("Failed to save '{}': {}", path, e),
        };

        let target = Path::new(&path);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| failed(&e))?;
        }

        let format = image::ImageFormat::from_path(target).map_err(|e| failed(&e))?;
        let result = match format {
            image::ImageFormat::Jpeg => data.to_rgb8().save_with_format(target, format),
            _ => data.to_rgba8().save_with_format(target, format),
        };
        result.map_err(|e| failed(&e))?;
        log::info!("Saved {}", path);

        ctx.set_output("path", Value::String(path))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}
