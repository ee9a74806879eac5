//! Colour and tone stages: saturation, brightness-contrast, colour
//! temperature and hue-chroma.

use super::colorspace::{kelvin_to_rgb, lab_to_lch, lab_to_rgb, lch_to_lab, rgb_to_lab, KELVIN_RANGE};
use super::{image_stage, map_rgb, pass_through};
use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{ExecutionError, ValidationError};
use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::core::port::ParameterDefinition;
use crate::filters::registry::FilterRegistry;

/// Register colour filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(|| Box::new(Saturation));
    registry.register(|| Box::new(BrightnessContrast));
    registry.register(|| Box::new(ColorTemperature));
    registry.register(|| Box::new(HueChroma));
}

// ============================================================================
// Saturation
// ============================================================================

/// Parameters of [`Saturation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaturationParam {
    Scale,
}

impl SaturationParam {
    pub fn name(self) -> &'static str {
        match self {
            SaturationParam::Scale => "scale",
        }
    }
}

/// Scales colourfulness by multiplying the Lab a/b components.
#[derive(Debug, Clone)]
pub struct Saturation;

impl Saturation {
    pub const ID: &'static str = "metaops:saturation";
}

impl FilterNode for Saturation {
    fn metadata(&self) -> NodeMetadata {
        image_stage(Self::ID, "Saturation", Category::Color)
            .description("Changes the saturation")
            .parameter(
                ParameterDefinition::float(SaturationParam::Scale.name(), 1.0)
                    .with_display_name("Scale")
                    .with_description("Scale, strength of effect")
                    .with_range(0.0, 1000.0)
                    .with_ui_range(0.0, 2.0),
            )
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let scale = ctx.get_float(SaturationParam::Scale.name())? as f32;
        if scale == 1.0 {
            return pass_through(ctx);
        }

        map_rgb(ctx, |rgb| {
            let [l, a, b] = rgb_to_lab(rgb);
            lab_to_rgb([l, a * scale, b * scale])
        })
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Brightness-contrast
// ============================================================================

/// Parameters of [`BrightnessContrast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrightnessContrastParam {
    Contrast,
    Brightness,
}

impl BrightnessContrastParam {
    pub fn name(self) -> &'static str {
        match self {
            BrightnessContrastParam::Contrast => "contrast",
            BrightnessContrastParam::Brightness => "brightness",
        }
    }
}

/// Linear tone adjustment around mid gray:
/// `out = (in - 0.5) * contrast + brightness + 0.5`.
#[derive(Debug, Clone)]
pub struct BrightnessContrast;

impl BrightnessContrast {
    pub const ID: &'static str = "metaops:brightness-contrast";
}

impl FilterNode for BrightnessContrast {
    fn metadata(&self) -> NodeMetadata {
        image_stage(Self::ID, "Brightness Contrast", Category::Adjust)
            .description("Changes the light level and contrast")
            .parameter(
                ParameterDefinition::float(BrightnessContrastParam::Contrast.name(), 1.0)
                    .with_description("Magnitude of contrast scaling >1.0 brighten < 1.0 darken")
                    .with_range(-5.0, 5.0)
                    .with_ui_range(0.0, 2.0),
            )
            .parameter(
                ParameterDefinition::float(BrightnessContrastParam::Brightness.name(), 0.0)
                    .with_description("Amount to increase brightness")
                    .with_range(-3.0, 3.0)
                    .with_ui_range(-1.0, 1.0),
            )
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let contrast = ctx.get_float(BrightnessContrastParam::Contrast.name())? as f32;
        let brightness = ctx.get_float(BrightnessContrastParam::Brightness.name())? as f32;
        if contrast == 1.0 && brightness == 0.0 {
            return pass_through(ctx);
        }

        map_rgb(ctx, |rgb| rgb.map(|c| (c - 0.5) * contrast + brightness + 0.5))
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Colour temperature
// ============================================================================

/// Parameters of [`ColorTemperature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTemperatureParam {
    OriginalTemperature,
    IntendedTemperature,
}

impl ColorTemperatureParam {
    pub fn name(self) -> &'static str {
        match self {
            ColorTemperatureParam::OriginalTemperature => "original-temperature",
            ColorTemperatureParam::IntendedTemperature => "intended-temperature",
        }
    }
}

/// White balance correction between two black-body light sources.
///
/// Each channel is multiplied by `white(original) / white(intended)`.
/// Temperatures outside the black-body approximation's range are clamped
/// when the filter runs.
#[derive(Debug, Clone)]
pub struct ColorTemperature;

impl ColorTemperature {
    pub const ID: &'static str = "metaops:color-temperature";

    /// Per-channel multipliers, or `None` when the correction is a no-op.
    pub fn coefficients(original: f64, intended: f64) -> Option<[f32; 3]> {
        let (lo, hi) = KELVIN_RANGE;
        let original = (original as f32).clamp(lo, hi);
        let intended = (intended as f32).clamp(lo, hi);
        if original == intended {
            return None;
        }

        let from = kelvin_to_rgb(original);
        let to = kelvin_to_rgb(intended);
        Some([from[0] / to[0], from[1] / to[1], from[2] / to[2]])
    }
}

impl FilterNode for ColorTemperature {
    fn metadata(&self) -> NodeMetadata {
        let (lo, hi) = KELVIN_RANGE;
        image_stage(Self::ID, "Color Temperature", Category::Color)
            .description("Change the color temperature of the image")
            .parameter(
                ParameterDefinition::float(ColorTemperatureParam::OriginalTemperature.name(), 6500.0)
                    .with_description("Estimated temperature of the light source in Kelvin the image was taken with.")
                    .with_range(lo as f64, hi as f64)
                    .with_ui_meta("unit", "kelvin"),
            )
            .parameter(
                ParameterDefinition::float(ColorTemperatureParam::IntendedTemperature.name(), 6500.0)
                    .with_description("Corrected estimation of the temperature of the light source in Kelvin.")
                    .with_range(lo as f64, hi as f64)
                    .with_ui_meta("unit", "kelvin"),
            )
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let original = ctx.get_float(ColorTemperatureParam::OriginalTemperature.name())?;
        let intended = ctx.get_float(ColorTemperatureParam::IntendedTemperature.name())?;

        match Self::coefficients(original, intended) {
            None => pass_through(ctx),
            Some(k) => map_rgb(ctx, |[r, g, b]| [r * k[0], g * k[1], b * k[2]]),
        }
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Hue-chroma
// ============================================================================

/// Parameters of [`HueChroma`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HueChromaParam {
    Hue,
    Chroma,
    Lightness,
}

impl HueChromaParam {
    pub fn name(self) -> &'static str {
        match self {
            HueChromaParam::Hue => "hue",
            HueChromaParam::Chroma => "chroma",
            HueChromaParam::Lightness => "lightness",
        }
    }
}

/// Offsets in CIE LCh(ab): hue rotation in degrees, chroma and lightness
/// shifts. Chroma never goes below zero.
#[derive(Debug, Clone)]
pub struct HueChroma;

impl HueChroma {
    pub const ID: &'static str = "metaops:hue-chroma";
}

impl FilterNode for HueChroma {
    fn metadata(&self) -> NodeMetadata {
        image_stage(Self::ID, "Hue Chroma", Category::Color)
            .description("Adjust LCH Hue, Chroma, and Lightness")
            .parameter(
                ParameterDefinition::float(HueChromaParam::Hue.name(), 0.0)
                    .with_description("Hue adjustment")
                    .with_range(-180.0, 180.0)
                    .with_ui_meta("unit", "degree"),
            )
            .parameter(
                ParameterDefinition::float(HueChromaParam::Chroma.name(), 0.0)
                    .with_description("Chroma adjustment")
                    .with_range(-100.0, 100.0),
            )
            .parameter(
                ParameterDefinition::float(HueChromaParam::Lightness.name(), 0.0)
                    .with_description("Lightness adjustment")
                    .with_range(-100.0, 100.0),
            )
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let hue = ctx.get_float(HueChromaParam::Hue.name())? as f32;
        let chroma = ctx.get_float(HueChromaParam::Chroma.name())? as f32;
        let lightness = ctx.get_float(HueChromaParam::Lightness.name())? as f32;
        if hue == 0.0 && chroma == 0.0 && lightness == 0.0 {
            return pass_through(ctx);
        }

        map_rgb(ctx, |rgb| {
            let [l, c, h] = lab_to_lch(rgb_to_lab(rgb));
            let lch = [l + lightness, (c + chroma).max(0.0), (h + hue).rem_euclid(360.0)];
            lab_to_rgb(lch_to_lab(lch))
        })
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}
