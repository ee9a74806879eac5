//! The `FilterNode` trait, node metadata, and the proxy nodes that bound a
//! composite's internal pipeline.

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{BuildError, ExecutionError, GraphResult, ValidationError};
use crate::core::port::{ParameterDefinition, PortDefinition};
use crate::core::types::{PortType, Value};
use crate::filters::registry::FilterRegistry;
use serde::{Deserialize, Serialize};

/// Listing group for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Input,
    Output,
    Adjust,
    Color,
    Sharpen,
    /// Composites that do not fit a narrower group.
    Generic,
    #[default]
    Utility,
}

impl Category {
    /// Every category, in listing order.
    pub const ALL: [Category; 7] = [
        Category::Input,
        Category::Output,
        Category::Adjust,
        Category::Color,
        Category::Sharpen,
        Category::Generic,
        Category::Utility,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Input => "Input",
            Category::Output => "Output",
            Category::Adjust => "Adjust",
            Category::Color => "Color",
            Category::Sharpen => "Sharpen",
            Category::Generic => "Generic",
            Category::Utility => "Utility",
        }
    }
}

/// Everything a host needs to know about an operation without running it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Registry key, e.g. `metaops:saturation`.
    pub id: String,
    pub name: String,
    pub category: Category,
    pub description: String,
    /// Content hash of the operation's declaration, for composites.
    pub reference_hash: Option<String>,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    /// Declaration order is presentation order.
    pub parameters: Vec<ParameterDefinition>,
    /// Extra search terms.
    pub tags: Vec<String>,
}

impl NodeMetadata {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> NodeMetadataBuilder {
        NodeMetadataBuilder(NodeMetadata {
            id: id.into(),
            name: name.into(),
            category: Category::default(),
            description: String::new(),
            reference_hash: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            tags: Vec::new(),
        })
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn get_input(&self, name: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn get_output(&self, name: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn get_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Chained construction of [`NodeMetadata`].
#[derive(Debug, Clone)]
pub struct NodeMetadataBuilder(NodeMetadata);

impl NodeMetadataBuilder {
    pub fn category(mut self, category: Category) -> Self {
        self.0.category = category;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.0.description = description.into();
        self
    }

    pub fn reference_hash(mut self, hash: impl Into<String>) -> Self {
        self.0.reference_hash = Some(hash.into());
        self
    }

    pub fn input(mut self, port: PortDefinition) -> Self {
        self.0.inputs.push(port);
        self
    }

    pub fn output(mut self, port: PortDefinition) -> Self {
        self.0.outputs.push(port);
        self
    }

    pub fn parameter(mut self, param: ParameterDefinition) -> Self {
        self.0.parameters.push(param);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> NodeMetadata {
        self.0
    }
}

/// An operation that can be placed in a [`ProcessingGraph`].
///
/// The lifecycle of an instance is:
///
/// 1. [`attach`](FilterNode::attach), once, from
///    [`FilterRegistry::instantiate`]. Composites build their internal
///    pipeline here.
/// 2. [`forward_parameter`](FilterNode::forward_parameter) on every
///    parameter write made through the owning graph node.
/// 3. [`validate`](FilterNode::validate) and then
///    [`execute`](FilterNode::execute), any number of times, possibly on
///    worker threads.
///
/// [`ProcessingGraph`]: crate::graph::ProcessingGraph
pub trait FilterNode: Send + Sync {
    fn metadata(&self) -> NodeMetadata;

    /// Check parameters without touching pixel data.
    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError>;

    /// Read inputs and parameters from `ctx` and set its outputs.
    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError>;

    /// On error the instance must be left as it was.
    fn attach(&mut self, _registry: &FilterRegistry) -> Result<(), BuildError> {
        Ok(())
    }

    fn forward_parameter(&mut self, _name: &str, _value: &Value) -> GraphResult<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn FilterNode>;
}

impl Clone for Box<dyn FilterNode> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Boundary node of a composite's internal graph. Copies `input` to
/// `output` unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyNode {
    /// Receives the composite's input from outside the graph.
    Input,
    /// Holds the composite's result.
    Output,
}

impl ProxyNode {
    pub const INPUT_ID: &'static str = "metaops:input-proxy";
    pub const OUTPUT_ID: &'static str = "metaops:output-proxy";
}

impl FilterNode for ProxyNode {
    fn metadata(&self) -> NodeMetadata {
        let (id, name, port) = match self {
            // fed directly by the engine, never by a connection
            ProxyNode::Input => (
                Self::INPUT_ID,
                "Input Proxy",
                PortDefinition::input("input", PortType::Any).optional(),
            ),
            ProxyNode::Output => (
                Self::OUTPUT_ID,
                "Output Proxy",
                PortDefinition::input("input", PortType::Any),
            ),
        };

        NodeMetadata::builder(id, name)
            .category(Category::Utility)
            .description("Passes the input through unchanged")
            .input(port)
            .output(PortDefinition::output("output", PortType::Any))
            .build()
    }

    fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let value = ctx.take_input("input")?;
        ctx.set_output("output", value)
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::NodeId;

    #[test]
    fn test_metadata_lookup() {
        let metadata = NodeMetadata::builder("test:filter", "Test Filter")
            .category(Category::Generic)
            .reference_hash("abc123")
            .input(PortDefinition::input("input", PortType::Image))
            .output(PortDefinition::output("output", PortType::Image))
            .parameter(ParameterDefinition::float("scale", 1.0))
            .parameter(ParameterDefinition::float("it", 6500.0))
            .tags(["test"])
            .build();

        assert_eq!(metadata.category, Category::Generic);
        assert_eq!(metadata.reference_hash.as_deref(), Some("abc123"));
        assert_eq!(metadata.parameter_names(), vec!["scale", "it"]);
        assert!(metadata.get_input("input").is_some());
        assert!(metadata.get_input("output").is_none());
        assert!(metadata.get_output("missing").is_none());
    }

    #[test]
    fn test_proxy_passes_value() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        ctx.add_input("input", Value::Integer(42));
        ProxyNode::Output.execute(&mut ctx).unwrap();

        assert_eq!(ctx.take_outputs().get("output"), Some(&Value::Integer(42)));
    }

    #[test]
    fn test_only_input_proxy_is_optional() {
        assert!(ProxyNode::Input.metadata().inputs[0].optional);
        assert!(!ProxyNode::Output.metadata().inputs[0].optional);
        assert_eq!(ProxyNode::Output.metadata().id, ProxyNode::OUTPUT_ID);
    }
}
