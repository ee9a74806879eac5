//! Built-in filter implementations.
//!
//! The primitive stages (colour, tone and sharpening operations), the
//! pipeline proxies and image file I/O. Every image stage reads an `input`
//! port and writes an `output` port, working on RGBA f32 pixels with alpha
//! passed through untouched.

pub mod colorspace;
mod color;
mod io;
mod sharpen;

use crate::core::context::ExecutionContext;
use crate::core::error::ExecutionError;
use crate::core::node::{Category, NodeMetadata, NodeMetadataBuilder, ProxyNode};
use crate::core::port::PortDefinition;
use crate::core::types::{ImageValue, PortType, Value};
use crate::filters::registry::FilterRegistry;
use image::{DynamicImage, Rgba32FImage};

/// Register all built-in filters.
pub fn register_all(registry: &mut FilterRegistry) {
    color::register(registry);
    sharpen::register(registry);
    io::register(registry);
    registry.register(|| Box::new(ProxyNode::Input));
    registry.register(|| Box::new(ProxyNode::Output));
}

// Re-export for direct access
pub use color::{
    BrightnessContrast, BrightnessContrastParam, ColorTemperature, ColorTemperatureParam,
    HueChroma, HueChromaParam, Saturation, SaturationParam,
};
pub use io::{LoadImage, SaveImage};
pub use sharpen::{UnsharpMask, UnsharpMaskParam};

/// Metadata skeleton shared by image-to-image stages.
pub(crate) fn image_stage(id: &str, name: &str, category: Category) -> NodeMetadataBuilder {
    NodeMetadata::builder(id, name)
        .category(category)
        .input(PortDefinition::input("input", PortType::Image).with_description("Input image"))
        .output(PortDefinition::output("output", PortType::Image).with_description("Adjusted image"))
}

/// Forward the input image unchanged, sharing its pixel buffer.
pub(crate) fn pass_through(ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
    let image = ctx.get_input_image("input")?.clone();
    ctx.set_output_image("output", image)
}

/// The input image as an RGBA f32 buffer.
pub(crate) fn input_rgba32f(ctx: &ExecutionContext) -> Result<Rgba32FImage, ExecutionError> {
    Ok(ctx.get_input_image("input")?.pixels().to_rgba32f())
}

/// Apply `f` to the colour channels of every pixel and set the output.
pub(crate) fn map_rgb<F>(ctx: &mut ExecutionContext, f: F) -> Result<(), ExecutionError>
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    let mut buffer = input_rgba32f(ctx)?;
    for pixel in buffer.pixels_mut() {
        let [r, g, b] = f([pixel[0], pixel[1], pixel[2]]);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    }
    set_output_rgba32f(ctx, buffer)
}

pub(crate) fn set_output_rgba32f(
    ctx: &mut ExecutionContext,
    buffer: Rgba32FImage,
) -> Result<(), ExecutionError> {
    let image = ImageValue::new(DynamicImage::ImageRgba32F(buffer));
    ctx.set_output("output", Value::Image(image))
}
