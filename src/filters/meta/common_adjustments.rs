//! Common adjustments: saturation, brightness-contrast, colour temperature,
//! hue-chroma and unsharp mask behind one node with nine parameters.

use super::{MetaDescriptor, MetaOperation, Redirect};
use crate::core::node::{Category, NodeMetadata};
use crate::core::port::ParameterDefinition;
use crate::filters::builtin::{
    self as stages, BrightnessContrastParam, ColorTemperatureParam, HueChromaParam,
    SaturationParam, UnsharpMaskParam,
};
use std::sync::{Arc, OnceLock};

/// Pipeline stages, in the order the image flows through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Saturation,
    BrightnessContrast,
    ColorTemperature,
    HueChroma,
    UnsharpMask,
}

impl Stage {
    pub const PIPELINE: [Stage; 5] = [
        Stage::Saturation,
        Stage::BrightnessContrast,
        Stage::ColorTemperature,
        Stage::HueChroma,
        Stage::UnsharpMask,
    ];

    /// Registry id of the stage's filter.
    pub fn operation_id(self) -> &'static str {
        match self {
            Stage::Saturation => stages::Saturation::ID,
            Stage::BrightnessContrast => stages::BrightnessContrast::ID,
            Stage::ColorTemperature => stages::ColorTemperature::ID,
            Stage::HueChroma => stages::HueChroma::ID,
            Stage::UnsharpMask => stages::UnsharpMask::ID,
        }
    }

    /// Position in [`Stage::PIPELINE`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The exposed parameters, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustmentParam {
    Scale,
    Contrast,
    Brightness,
    OriginalTemperature,
    IntendedTemperature,
    Chroma,
    Lightness,
    SharpenRadius,
    SharpenScale,
}

impl AdjustmentParam {
    pub const ALL: [AdjustmentParam; 9] = [
        AdjustmentParam::Scale,
        AdjustmentParam::Contrast,
        AdjustmentParam::Brightness,
        AdjustmentParam::OriginalTemperature,
        AdjustmentParam::IntendedTemperature,
        AdjustmentParam::Chroma,
        AdjustmentParam::Lightness,
        AdjustmentParam::SharpenRadius,
        AdjustmentParam::SharpenScale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AdjustmentParam::Scale => "scale",
            AdjustmentParam::Contrast => "contrast",
            AdjustmentParam::Brightness => "brightness",
            AdjustmentParam::OriginalTemperature => "ot",
            AdjustmentParam::IntendedTemperature => "it",
            AdjustmentParam::Chroma => "chroma",
            AdjustmentParam::Lightness => "lightness",
            AdjustmentParam::SharpenRadius => "sharpenradius",
            AdjustmentParam::SharpenScale => "sharpenscale",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The stage parameter this one writes through to.
    pub fn target(self) -> (Stage, &'static str) {
        match self {
            AdjustmentParam::Scale => (Stage::Saturation, SaturationParam::Scale.name()),
            AdjustmentParam::Contrast => {
                (Stage::BrightnessContrast, BrightnessContrastParam::Contrast.name())
            }
            AdjustmentParam::Brightness => {
                (Stage::BrightnessContrast, BrightnessContrastParam::Brightness.name())
            }
            AdjustmentParam::OriginalTemperature => (
                Stage::ColorTemperature,
                ColorTemperatureParam::OriginalTemperature.name(),
            ),
            AdjustmentParam::IntendedTemperature => (
                Stage::ColorTemperature,
                ColorTemperatureParam::IntendedTemperature.name(),
            ),
            AdjustmentParam::Chroma => (Stage::HueChroma, HueChromaParam::Chroma.name()),
            AdjustmentParam::Lightness => (Stage::HueChroma, HueChromaParam::Lightness.name()),
            AdjustmentParam::SharpenRadius => (Stage::UnsharpMask, UnsharpMaskParam::StdDev.name()),
            AdjustmentParam::SharpenScale => (Stage::UnsharpMask, UnsharpMaskParam::Scale.name()),
        }
    }

    /// The exposed declaration.
    pub fn definition(self) -> ParameterDefinition {
        let def = |default: f64, label: &str, min: f64, max: f64| {
            ParameterDefinition::float(self.name(), default)
                .with_display_name(label)
                .with_range(min, max)
        };

        match self {
            AdjustmentParam::Scale => def(1.0, "Saturation", 0.0, 1000.0)
                .with_ui_range(0.0, 20.0)
                .with_ui_gamma(1.5),
            AdjustmentParam::Contrast => def(1.0, "Contrast", -5.0, 5.0)
                .with_ui_range(0.0, 2.0)
                .with_description("Magnitude of contrast scaling >1.0 brighten < 1.0 darken"),
            AdjustmentParam::Brightness => def(0.0, "Brightness", -3.0, 3.0)
                .with_ui_range(-1.0, 1.0)
                .with_description("Amount to increase brightness"),
            AdjustmentParam::OriginalTemperature => {
                def(6500.0, "Original temperature", -1000.0, 12000.0)
                    .with_ui_meta("unit", "kelvin")
                    .with_description(
                        "Estimated temperature of the light source in Kelvin the image was taken with.",
                    )
            }
            AdjustmentParam::IntendedTemperature => {
                def(6500.0, "Intended temperature", -1000.0, 12000.0)
                    .with_ui_meta("unit", "kelvin")
                    .with_description(
                        "Corrected estimation of the temperature of the light source in Kelvin.",
                    )
            }
            AdjustmentParam::Chroma => {
                def(0.0, "Chroma", -100.0, 100.0).with_description("Chroma adjustment")
            }
            AdjustmentParam::Lightness => {
                def(0.0, "Lightness", -100.0, 100.0).with_description("Lightness adjustment")
            }
            AdjustmentParam::SharpenRadius => def(0.0, "Sharpen Radius", 0.0, 1500.0)
                .with_ui_range(0.0, 40.0)
                .with_ui_gamma(3.0)
                .with_ui_meta("unit", "pixel-distance")
                .with_description("Expressed as standard deviation, in pixels"),
            AdjustmentParam::SharpenScale => def(0.5, "Sharpen Amount", 0.0, 300.0)
                .with_ui_range(0.0, 10.0)
                .with_ui_gamma(3.0)
                .with_description("Scaling factor for unsharp-mask, the strength of effect"),
        }
    }
}

/// Constructors for the common adjustments composite.
pub struct CommonAdjustments;

impl CommonAdjustments {
    pub const ID: &'static str = "metaops:common-adjustments";
    pub const TITLE: &'static str = "Common adjustment filters";
    pub const REFERENCE_HASH: &'static str = "45ed5656a238a5125700fc254001b2ac";

    /// The shared descriptor, built on first use.
    pub fn descriptor() -> Arc<MetaDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<MetaDescriptor>> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| Arc::new(Self::build_descriptor())).clone()
    }

    /// A fresh, unattached instance.
    pub fn operation() -> MetaOperation {
        MetaOperation::new(Self::descriptor())
    }

    fn build_descriptor() -> MetaDescriptor {
        let mut builder = stages::image_stage(Self::ID, Self::TITLE, Category::Generic)
            .description(
                "Common photography filters all in one place. \
                 (pro tip using presets and back up layers is a smart idea)",
            )
            .reference_hash(Self::REFERENCE_HASH)
            .tags(["photography", "adjust"]);
        for param in AdjustmentParam::ALL {
            builder = builder.parameter(param.definition());
        }
        let metadata: NodeMetadata = builder.build();

        let redirects = AdjustmentParam::ALL
            .into_iter()
            .map(|param| {
                let (stage, internal) = param.target();
                Redirect::new(param.name(), stage.index(), internal)
            })
            .collect();

        MetaDescriptor {
            metadata,
            stages: Stage::PIPELINE.iter().map(|s| s.operation_id().to_string()).collect(),
            redirects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ExecutionContext;
    use crate::core::error::{BuildError, GraphError, NodeId};
    use crate::core::node::{FilterNode, ProxyNode};
    use crate::core::types::{ImageValue, Value};
    use crate::filters::registry::FilterRegistry;
    use crate::graph::{ProcessingGraph, TopologyAnalyzer};
    use image::{DynamicImage, Rgba, Rgba32FImage};

    fn attached() -> MetaOperation {
        let mut op = CommonAdjustments::operation();
        op.attach(&FilterRegistry::with_builtins()).unwrap();
        op
    }

    fn gray() -> ImageValue {
        let buffer = Rgba32FImage::from_pixel(8, 8, Rgba([0.5, 0.5, 0.5, 1.0]));
        ImageValue::new(DynamicImage::ImageRgba32F(buffer))
    }

    fn run(filter: &dyn FilterNode, input: &ImageValue, params: &[(&str, f64)]) -> ImageValue {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_input("input", Value::Image(input.clone()));
        for def in &filter.metadata().parameters {
            ctx.add_parameter(def.name.clone(), def.default_value.clone());
        }
        for (name, value) in params {
            ctx.add_parameter(*name, Value::Float(*value));
        }
        filter.execute(&mut ctx).unwrap();
        ctx.take_outputs()
            .remove("output")
            .and_then(|v| v.as_image().cloned())
            .unwrap()
    }

    fn pixels(image: &ImageValue) -> Vec<f32> {
        image.pixels().to_rgba32f().into_raw()
    }

    #[test]
    fn test_metadata() {
        let meta = CommonAdjustments::operation().metadata();

        assert_eq!(meta.id, "metaops:common-adjustments");
        assert_eq!(meta.name, "Common adjustment filters");
        assert_eq!(meta.category, Category::Generic);
        assert_eq!(meta.reference_hash.as_deref(), Some("45ed5656a238a5125700fc254001b2ac"));
        assert!(meta.description.ends_with("smart idea)"));
        assert_eq!(
            meta.parameter_names(),
            vec![
                "scale", "contrast", "brightness", "ot", "it", "chroma", "lightness",
                "sharpenradius", "sharpenscale"
            ]
        );
        assert!(meta.get_input("input").is_some());
        assert!(meta.get_output("output").is_some());
    }

    #[test]
    fn test_declarations() {
        let meta = CommonAdjustments::descriptor().metadata.clone();

        let scale = meta.get_parameter("scale").unwrap();
        assert_eq!(scale.display_name, "Saturation");
        assert_eq!(scale.value_range(), Some((0.0, 1000.0)));
        assert_eq!(scale.slider_range(), Some((0.0, 20.0)));
        assert_eq!(scale.ui_gamma(), Some(1.5));

        let ot = meta.get_parameter("ot").unwrap();
        assert_eq!(ot.value_range(), Some((-1000.0, 12000.0)));
        assert_eq!(ot.unit(), Some("kelvin"));
        assert_eq!(ot.ui_gamma(), None);

        let radius = meta.get_parameter("sharpenradius").unwrap();
        assert_eq!(radius.unit(), Some("pixel-distance"));
        assert_eq!(radius.ui_gamma(), Some(3.0));

        assert_eq!(CommonAdjustments::descriptor().check(), Ok(()));
    }

    #[test]
    fn test_descriptor_is_shared() {
        let a = CommonAdjustments::operation();
        let b = CommonAdjustments::operation();
        assert!(std::ptr::eq(a.descriptor(), b.descriptor()));
    }

    #[test]
    fn test_defaults_match_stage_defaults() {
        let registry = FilterRegistry::with_builtins();
        let op = attached();

        for param in AdjustmentParam::ALL {
            let (stage, internal) = param.target();
            let stage_default = registry
                .get_metadata(stage.operation_id())
                .and_then(|m| m.get_parameter(internal))
                .map(|d| d.default_value.clone())
                .unwrap();
            let exposed_default = param.definition().default_value;

            assert_eq!(exposed_default, stage_default, "{}", param.name());
            assert_eq!(op.internal_parameter(param.name()).unwrap(), stage_default);
            assert_eq!(Value::Float(op.get_parameter(param.name()).unwrap()), stage_default);
        }
    }

    #[test]
    fn test_internal_graph_is_linear_chain() {
        let op = attached();
        let graph = op.graph().unwrap();

        assert_eq!(graph.node_count(), 7);
        assert_eq!(graph.connection_count(), 6);

        let chain = TopologyAnalyzer::new(graph).linear_chain().unwrap();
        let kinds: Vec<String> = chain
            .iter()
            .map(|id| graph.get_node(*id).unwrap().filter.metadata().id)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ProxyNode::INPUT_ID,
                "metaops:saturation",
                "metaops:brightness-contrast",
                "metaops:color-temperature",
                "metaops:hue-chroma",
                "metaops:unsharp-mask",
                ProxyNode::OUTPUT_ID,
            ]
        );
        assert_eq!(chain.first().copied(), op.input_proxy());
        assert_eq!(chain.last().copied(), op.output_proxy());
        assert_eq!(&chain[1..6], op.stage_ids());
    }

    #[test]
    fn test_second_attach_rejected() {
        let mut op = attached();
        let before = op.stage_ids().to_vec();

        assert_eq!(
            op.attach(&FilterRegistry::with_builtins()),
            Err(BuildError::AlreadyAttached(CommonAdjustments::ID.to_string()))
        );
        assert_eq!(op.stage_ids(), before.as_slice());
    }

    #[test]
    fn test_each_parameter_reaches_its_stage() {
        let mut op = attached();

        for (i, param) in AdjustmentParam::ALL.into_iter().enumerate() {
            let value = 0.125 * (i as f64 + 1.0);
            op.set_parameter(param.name(), value).unwrap();

            let (stage, internal) = param.target();
            let node = op.graph().unwrap().get_node(op.stage_ids()[stage.index()]).unwrap();
            assert_eq!(node.get_parameter(internal), Some(Value::Float(value)));
        }
    }

    #[test]
    fn test_defaults_pass_image_through() {
        let input = gray();
        let output = run(&attached(), &input, &[]);
        assert!(output.shares_pixels(&input));
    }

    #[test]
    fn test_matches_manual_stages() {
        let input = gray();
        let mut op = attached();
        op.set_parameter("scale", 2.0).unwrap();
        op.set_parameter("contrast", 1.2).unwrap();
        let composite = run(&op, &input, &[]);

        let saturated = run(&stages::Saturation, &input, &[("scale", 2.0)]);
        let manual = run(&stages::BrightnessContrast, &saturated, &[("contrast", 1.2)]);

        assert_eq!(pixels(&composite), pixels(&manual));
    }

    #[test]
    fn test_zero_sharpen_radius_is_identity() {
        let input = gray();
        let mut op = attached();
        op.set_parameter("sharpenradius", 0.0).unwrap();
        op.set_parameter("sharpenscale", 8.0).unwrap();

        assert!(run(&op, &input, &[]).shares_pixels(&input));
    }

    #[test]
    fn test_host_clamps_before_forwarding() {
        let mut graph = ProcessingGraph::new();
        let node = graph.add_filter(
            FilterRegistry::with_builtins()
                .instantiate(CommonAdjustments::ID)
                .unwrap(),
        );

        graph.set_parameter(node, "ot", Value::Float(-5000.0)).unwrap();
        graph.set_parameter(node, "scale", Value::Float(2000.0)).unwrap();

        let stored = graph.get_node(node).unwrap();
        assert_eq!(stored.get_parameter("ot"), Some(Value::Float(-1000.0)));
        assert_eq!(stored.get_parameter("scale"), Some(Value::Float(1000.0)));
    }

    #[test]
    fn test_host_rejects_non_finite_values() {
        let mut graph = ProcessingGraph::new();
        let node = graph.add_filter(
            FilterRegistry::with_builtins()
                .instantiate(CommonAdjustments::ID)
                .unwrap(),
        );

        let result = graph.set_parameter(node, "scale", Value::Float(f64::NAN));
        assert!(matches!(result, Err(GraphError::InvalidParameter { .. })));
        assert!(graph.set_parameter(node, "it", Value::Float(f64::INFINITY)).is_err());

        let stored = graph.get_node(node).unwrap();
        assert!(stored.parameters().is_empty());
        assert_eq!(stored.get_parameter("scale"), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_warm_light_stays_in_gamut() {
        let input = gray();
        let mut op = attached();

        for kelvin in [-1000.0, 1000.0, 1500.0, 2000.0, 3000.0] {
            op.set_parameter("it", kelvin).unwrap();
            let output = pixels(&run(&op, &input, &[]));
            assert!(
                output.iter().all(|c| c.is_finite() && *c > 0.0),
                "it = {}: {:?}",
                kelvin,
                &output[..4]
            );
        }
    }

    #[test]
    fn test_param_lookup() {
        assert_eq!(AdjustmentParam::from_name("it"), Some(AdjustmentParam::IntendedTemperature));
        assert_eq!(AdjustmentParam::from_name("hue"), None);
        assert_eq!(Stage::UnsharpMask.index(), 4);
    }
}
