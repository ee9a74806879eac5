//! Unsharp mask sharpening.

use super::{image_stage, input_rgba32f, pass_through, set_output_rgba32f};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::ParameterDefinition;
use crate::filters::registry::FilterRegistry;

/// Register sharpening filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(|| Box::new(UnsharpMask));
}

/// Parameters of [`UnsharpMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsharpMaskParam {
    StdDev,
    Scale,
}

impl UnsharpMaskParam {
    pub fn name(self) -> &'static str {
        match self {
            UnsharpMaskParam::StdDev => "std-dev",
            UnsharpMaskParam::Scale => "scale",
        }
    }
}

/// Unsharp mask: `out = in + scale * (in - blur(in, std-dev))`.
///
/// Only colour channels are sharpened.
#[derive(Debug, Clone)]
pub struct UnsharpMask;

impl UnsharpMask {
    pub const ID: &'static str = "metaops:unsharp-mask";
}

impl FilterNode for UnsharpMask {
    fn metadata(&self) -> NodeMetadata {
        image_stage(Self::ID, "Sharpen (Unsharp Mask)", Category::Sharpen)
            .description(
                "Sharpen image, by adding difference to blurred image, a technique \
                 for sharpening invented in film darkrooms",
            )
            .parameter(
                ParameterDefinition::float(UnsharpMaskParam::StdDev.name(), 0.0)
                    .with_display_name("Radius")
                    .with_description("Expressed as standard deviation, in pixels")
                    .with_range(0.0, 1500.0)
                    .with_ui_range(0.0, 40.0)
                    .with_ui_gamma(3.0)
                    .with_ui_meta("unit", "pixel-distance"),
            )
            .parameter(
                ParameterDefinition::float(UnsharpMaskParam::Scale.name(), 0.5)
                    .with_display_name("Amount")
                    .with_description("Scaling factor for unsharp-mask, the strength of effect")
                    .with_range(0.0, 300.0)
                    .with_ui_range(0.0, 10.0)
                    .with_ui_gamma(3.0),
            )
            .tags(["sharpen", "unsharp"])
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let std_dev = ctx.get_float(UnsharpMaskParam::StdDev.name())? as f32;
        let scale = ctx.get_float(UnsharpMaskParam::Scale.name())? as f32;
        if std_dev <= 0.0 || scale == 0.0 {
            return pass_through(ctx);
        }

        let mut buffer = input_rgba32f(ctx)?;
        let blurred = image::imageops::blur(&buffer, std_dev);

        for (pixel, soft) in buffer.pixels_mut().zip(blurred.pixels()) {
            for c in 0..3 {
                let detail = pixel[c] - soft[c];
                pixel[c] += scale * detail;
            }
        }

        set_output_rgba32f(ctx, buffer)
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::NodeId;
    use crate::core::types::{ImageValue, Value};
    use image::{DynamicImage, Rgba, Rgba32FImage};

    fn run(input: &ImageValue, std_dev: f64, scale: f64) -> ImageValue {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_input("input", Value::Image(input.clone()));
        ctx.add_parameter("std-dev", Value::Float(std_dev));
        ctx.add_parameter("scale", Value::Float(scale));
        UnsharpMask.execute(&mut ctx).unwrap();
        ctx.take_outputs()
            .remove("output")
            .and_then(|v| v.as_image().cloned())
            .unwrap()
    }

    fn edge() -> ImageValue {
        let buffer = Rgba32FImage::from_fn(16, 1, |x, _| {
            let v = if x < 8 { 0.25 } else { 0.75 };
            Rgba([v, v, v, 0.5])
        });
        ImageValue::new(DynamicImage::ImageRgba32F(buffer))
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let input = edge();
        assert!(run(&input, 0.0, 5.0).shares_pixels(&input));
        assert!(run(&input, 3.0, 0.0).shares_pixels(&input));
    }

    #[test]
    fn test_edge_contrast_increases() {
        let output = run(&edge(), 2.0, 1.0);
        let buffer = output.pixels().to_rgba32f();

        let dark = buffer.get_pixel(7, 0);
        let light = buffer.get_pixel(8, 0);
        assert!(dark[0] < 0.25, "dark side {}", dark[0]);
        assert!(light[0] > 0.75, "light side {}", light[0]);
        assert_eq!(light[3], 0.5);
    }

    #[test]
    fn test_flat_image_unchanged() {
        let flat = ImageValue::new(DynamicImage::ImageRgba32F(Rgba32FImage::from_pixel(
            8,
            8,
            Rgba([0.4, 0.4, 0.4, 1.0]),
        )));
        let output = run(&flat, 1.5, 2.0);
        let pixel = output.pixels().to_rgba32f().get_pixel(4, 4).0;
        assert!((pixel[0] - 0.4).abs() < 1e-3);
    }
}
