//! Composite ("meta") operations.
//!
//! A composite wraps a fixed linear pipeline of registered stage filters
//! behind a single node. It is described by a [`MetaDescriptor`]: the
//! exposed parameter table, the ordered stage kinds, and a redirect table
//! mapping each exposed parameter to one parameter of one stage.
//!
//! [`MetaOperation`] is the node itself. Attaching it to a registry builds
//! the internal graph (input proxy, stages, output proxy) and seeds every
//! bound stage parameter with the exposed default. After that, writing an
//! exposed parameter writes the same value into the bound stage parameter.

pub mod common_adjustments;
pub mod preset;

pub use common_adjustments::{AdjustmentParam, CommonAdjustments, Stage};
pub use preset::{ParameterPreset, PresetFormat};

use crate::core::context::{ExecutionContext, ValidationContext};
use crate::core::error::{
    BuildError, BuildResult, ExecutionError, GraphError, GraphResult, MetaopsError, NodeId,
    ValidationError,
};
use crate::core::node::{FilterNode, NodeMetadata, ProxyNode};
use crate::core::types::{PortType, Value};
use crate::execution::{ExecutionEngine, ExecutionOptions, NodeValues};
use crate::filters::registry::FilterRegistry;
use crate::graph::ProcessingGraph;
use crate::validation::declarations::validate_parameter_table;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Register all composite operations.
pub fn register_all(registry: &mut FilterRegistry) {
    registry.register(|| Box::new(CommonAdjustments::operation()));
}

/// Binds one exposed parameter to a parameter of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Exposed parameter name.
    pub exposed: String,
    /// Index into [`MetaDescriptor::stages`].
    pub stage: usize,
    /// Parameter name on the stage.
    pub internal: String,
}

impl Redirect {
    pub fn new(exposed: impl Into<String>, stage: usize, internal: impl Into<String>) -> Self {
        Self {
            exposed: exposed.into(),
            stage,
            internal: internal.into(),
        }
    }
}

/// Static description of a composite operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaDescriptor {
    /// What the host sees: id, ports and the exposed parameter table.
    pub metadata: NodeMetadata,
    /// Stage operation kinds, in pipeline order.
    pub stages: Vec<String>,
    /// One entry per exposed parameter.
    pub redirects: Vec<Redirect>,
}

impl MetaDescriptor {
    /// The redirect for an exposed parameter.
    pub fn redirect(&self, exposed: &str) -> Option<&Redirect> {
        self.redirects.iter().find(|r| r.exposed == exposed)
    }

    /// Check the descriptor's internal consistency.
    ///
    /// Stage parameter names cannot be checked here; that happens at attach
    /// against the instantiated stages.
    pub fn check(&self) -> BuildResult<()> {
        let malformed = |reason: String| BuildError::MalformedDescriptor {
            operation: self.metadata.id.clone(),
            reason,
        };

        if self.stages.is_empty() {
            return Err(malformed("pipeline has no stages".to_string()));
        }

        for port in ["input", "output"] {
            let declared = match port {
                "input" => self.metadata.get_input(port),
                _ => self.metadata.get_output(port),
            };
            if declared.map(|p| &p.port_type) != Some(&PortType::Image) {
                return Err(malformed(format!("missing image port '{}'", port)));
            }
        }

        if let Err(errors) = validate_parameter_table(&self.metadata.id, &self.metadata.parameters) {
            let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(malformed(reasons.join("; ")));
        }

        for param in &self.metadata.parameters {
            if param.param_type != PortType::Float {
                return Err(malformed(format!("parameter '{}' is not a float", param.name)));
            }
            match self.redirects.iter().filter(|r| r.exposed == param.name).count() {
                1 => {}
                0 => return Err(malformed(format!("parameter '{}' has no redirect", param.name))),
                _ => return Err(malformed(format!("parameter '{}' is redirected twice", param.name))),
            }
        }

        let mut targets = HashSet::new();
        for redirect in &self.redirects {
            if self.metadata.get_parameter(&redirect.exposed).is_none() {
                return Err(malformed(format!(
                    "redirect from undeclared parameter '{}'",
                    redirect.exposed
                )));
            }
            if redirect.stage >= self.stages.len() {
                return Err(malformed(format!(
                    "'{}' redirects to stage {} of {}",
                    redirect.exposed,
                    redirect.stage,
                    self.stages.len()
                )));
            }
            if !targets.insert((redirect.stage, redirect.internal.as_str())) {
                return Err(malformed(format!(
                    "stage {} parameter '{}' is bound twice",
                    redirect.stage, redirect.internal
                )));
            }
        }

        Ok(())
    }
}

/// The internal pipeline of an attached composite.
#[derive(Debug, Clone)]
struct AttachedGraph {
    graph: ProcessingGraph,
    input: NodeId,
    output: NodeId,
    stages: Vec<NodeId>,
    /// Last written value of each exposed parameter, in declaration order.
    values: IndexMap<String, f64>,
}

#[derive(Debug, Clone)]
enum AttachState {
    Unattached,
    Attached(Box<AttachedGraph>),
}

/// A composite filter node driven by a [`MetaDescriptor`].
#[derive(Debug, Clone)]
pub struct MetaOperation {
    descriptor: Arc<MetaDescriptor>,
    state: AttachState,
}

impl MetaOperation {
    /// Create an unattached instance.
    pub fn new(descriptor: Arc<MetaDescriptor>) -> Self {
        Self {
            descriptor,
            state: AttachState::Unattached,
        }
    }

    pub fn descriptor(&self) -> &MetaDescriptor {
        &self.descriptor
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, AttachState::Attached(_))
    }

    fn attached(&self) -> Option<&AttachedGraph> {
        match &self.state {
            AttachState::Attached(attached) => Some(attached),
            AttachState::Unattached => None,
        }
    }

    fn not_attached(&self) -> GraphError {
        GraphError::NotAttached(self.descriptor.metadata.id.clone())
    }

    fn unknown(&self, name: &str) -> GraphError {
        GraphError::UnknownParameter {
            operation: self.descriptor.metadata.id.clone(),
            parameter: name.to_string(),
        }
    }

    /// Build the internal pipeline from `registry`.
    ///
    /// Everything is assembled in a local graph and installed at the end,
    /// so on error the instance is still unattached.
    fn build(&self, registry: &FilterRegistry) -> BuildResult<AttachedGraph> {
        let descriptor = &self.descriptor;
        descriptor.check()?;

        let mut graph = ProcessingGraph::new().with_name(descriptor.metadata.id.clone());
        let input = graph.add_filter(registry.instantiate(ProxyNode::INPUT_ID)?);
        let mut stages = Vec::with_capacity(descriptor.stages.len());
        for kind in &descriptor.stages {
            stages.push(graph.add_filter(registry.instantiate(kind)?));
        }
        let output = graph.add_filter(registry.instantiate(ProxyNode::OUTPUT_ID)?);

        let chain: Vec<NodeId> = std::iter::once(input)
            .chain(stages.iter().copied())
            .chain(std::iter::once(output))
            .collect();
        graph.connect_chain(&chain)?;

        let mut values = IndexMap::new();
        for param in &descriptor.metadata.parameters {
            let redirect = descriptor.redirect(&param.name).ok_or_else(|| {
                BuildError::MalformedDescriptor {
                    operation: descriptor.metadata.id.clone(),
                    reason: format!("parameter '{}' has no redirect", param.name),
                }
            })?;
            let default = param.default_value.as_float().unwrap_or_default();

            let node = graph.get_node_mut(stages[redirect.stage])?;
            if node.filter.metadata().get_parameter(&redirect.internal).is_none() {
                return Err(BuildError::UnknownInternalParameter {
                    stage: redirect.stage,
                    operation: descriptor.stages[redirect.stage].clone(),
                    parameter: redirect.internal.clone(),
                });
            }
            node.set_parameter(redirect.internal.clone(), Value::Float(default))?;
            values.insert(param.name.clone(), default);
        }

        Ok(AttachedGraph {
            graph,
            input,
            output,
            stages,
            values,
        })
    }

    /// Write an exposed parameter through to its bound stage parameter.
    ///
    /// The value is not clamped here.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> GraphResult<()> {
        let redirect = self.descriptor.redirect(name).ok_or_else(|| self.unknown(name))?;
        let AttachState::Attached(attached) = &mut self.state else {
            return Err(GraphError::NotAttached(self.descriptor.metadata.id.clone()));
        };

        let stage = attached.stages[redirect.stage];
        attached
            .graph
            .get_node_mut(stage)?
            .set_parameter(redirect.internal.clone(), Value::Float(value))?;
        attached.values.insert(name.to_string(), value);

        log::debug!(
            "{}: {} = {} -> {}.{}",
            self.descriptor.metadata.id,
            name,
            value,
            self.descriptor.stages[redirect.stage],
            redirect.internal
        );
        Ok(())
    }

    /// The last value written to an exposed parameter.
    pub fn get_parameter(&self, name: &str) -> GraphResult<f64> {
        if self.descriptor.redirect(name).is_none() {
            return Err(self.unknown(name));
        }
        let attached = self.attached().ok_or_else(|| self.not_attached())?;
        attached.values.get(name).copied().ok_or_else(|| self.unknown(name))
    }

    /// All exposed parameter values in declaration order.
    pub fn parameter_values(&self) -> GraphResult<&IndexMap<String, f64>> {
        self.attached()
            .map(|a| &a.values)
            .ok_or_else(|| self.not_attached())
    }

    /// The value currently held by the stage parameter bound to `name`.
    pub fn internal_parameter(&self, name: &str) -> GraphResult<Value> {
        let redirect = self.descriptor.redirect(name).ok_or_else(|| self.unknown(name))?;
        let attached = self.attached().ok_or_else(|| self.not_attached())?;
        let node = attached.graph.get_node(attached.stages[redirect.stage])?;

        node.get_parameter(&redirect.internal)
            .ok_or_else(|| GraphError::ParameterNotFound {
                node_id: node.id,
                parameter: redirect.internal.clone(),
            })
    }

    /// The internal graph, once attached.
    pub fn graph(&self) -> Option<&ProcessingGraph> {
        self.attached().map(|a| &a.graph)
    }

    pub fn input_proxy(&self) -> Option<NodeId> {
        self.attached().map(|a| a.input)
    }

    pub fn output_proxy(&self) -> Option<NodeId> {
        self.attached().map(|a| a.output)
    }

    /// Stage node ids in pipeline order; empty before attach.
    pub fn stage_ids(&self) -> &[NodeId] {
        self.attached().map(|a| a.stages.as_slice()).unwrap_or(&[])
    }
}

impl FilterNode for MetaOperation {
    fn metadata(&self) -> NodeMetadata {
        self.descriptor.metadata.clone()
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidationError> {
        if !self.is_attached() {
            return Err(ValidationError::CustomValidation {
                node_id: ctx.node_id,
                error: self.not_attached().to_string(),
            });
        }
        Ok(())
    }

    fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
        let node_id = ctx.node_id;
        let attached = self
            .attached()
            .ok_or_else(|| ExecutionError::NotAttached(self.descriptor.metadata.id.clone()))?;

        let image = ctx.take_input("input")?;
        let mut inputs = NodeValues::new();
        inputs.insert(attached.input, HashMap::from([("input".to_string(), image)]));

        let result = ExecutionEngine::new()
            .execute_with_inputs(&attached.graph, &inputs, Some(ExecutionOptions::sequential()))
            .map_err(|e| match e {
                MetaopsError::Execution(e) => e,
                other => ExecutionError::NodeExecution {
                    node_id,
                    error: other.to_string(),
                },
            })?;

        let output = result
            .output(attached.output, "output")
            .cloned()
            .ok_or_else(|| ExecutionError::OutputNotSet {
                node_id,
                port: "output".to_string(),
            })?;
        ctx.set_output("output", output)
    }

    fn attach(&mut self, registry: &FilterRegistry) -> Result<(), BuildError> {
        if self.is_attached() {
            return Err(BuildError::AlreadyAttached(self.descriptor.metadata.id.clone()));
        }

        let attached = self.build(registry)?;
        log::debug!(
            "Attached '{}' ({} stages)",
            self.descriptor.metadata.id,
            attached.stages.len()
        );
        self.state = AttachState::Attached(Box::new(attached));
        Ok(())
    }

    fn forward_parameter(&mut self, name: &str, value: &Value) -> GraphResult<()> {
        let value = value.as_float().ok_or_else(|| GraphError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("expected float, got {}", value.port_type()),
        })?;
        self.set_parameter(name, value)
    }

    fn clone_box(&self) -> Box<dyn FilterNode> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::Category;
    use crate::core::port::{ParameterDefinition, PortDefinition};

    fn descriptor(redirects: Vec<Redirect>) -> MetaDescriptor {
        let metadata = NodeMetadata::builder("test:two-step", "Two step")
            .category(Category::Generic)
            .input(PortDefinition::input("input", PortType::Image))
            .output(PortDefinition::output("output", PortType::Image))
            .parameter(ParameterDefinition::float("amount", 1.0).with_range(0.0, 10.0))
            .parameter(ParameterDefinition::float("lift", 0.0).with_range(-1.0, 1.0))
            .build();

        MetaDescriptor {
            metadata,
            stages: vec![
                "metaops:saturation".to_string(),
                "metaops:brightness-contrast".to_string(),
            ],
            redirects,
        }
    }

    fn valid() -> MetaDescriptor {
        descriptor(vec![
            Redirect::new("amount", 0, "scale"),
            Redirect::new("lift", 1, "brightness"),
        ])
    }

    #[test]
    fn test_check_accepts_valid_descriptor() {
        assert_eq!(valid().check(), Ok(()));
    }

    #[test]
    fn test_check_rejects_bad_redirects() {
        let missing = descriptor(vec![Redirect::new("amount", 0, "scale")]);
        assert!(matches!(missing.check(), Err(BuildError::MalformedDescriptor { .. })));

        let out_of_range = descriptor(vec![
            Redirect::new("amount", 0, "scale"),
            Redirect::new("lift", 2, "brightness"),
        ]);
        assert!(out_of_range.check().is_err());

        let shared_target = descriptor(vec![
            Redirect::new("amount", 1, "brightness"),
            Redirect::new("lift", 1, "brightness"),
        ]);
        assert!(shared_target.check().is_err());
    }

    #[test]
    fn test_attach_rejects_unknown_internal_parameter() {
        let registry = FilterRegistry::with_builtins();
        let bad = descriptor(vec![
            Redirect::new("amount", 0, "scale"),
            Redirect::new("lift", 1, "gamma"),
        ]);

        let mut op = MetaOperation::new(Arc::new(bad));
        assert_eq!(
            op.attach(&registry),
            Err(BuildError::UnknownInternalParameter {
                stage: 1,
                operation: "metaops:brightness-contrast".to_string(),
                parameter: "gamma".to_string(),
            })
        );
        assert!(!op.is_attached());
    }

    #[test]
    fn test_attach_with_unknown_stage_leaves_unattached() {
        let mut registry = FilterRegistry::with_builtins();
        registry.unregister("metaops:brightness-contrast");

        let mut op = MetaOperation::new(Arc::new(valid()));
        assert_eq!(
            op.attach(&registry),
            Err(BuildError::UnknownOperation("metaops:brightness-contrast".to_string()))
        );
        assert!(op.graph().is_none());
        assert!(op.stage_ids().is_empty());
    }

    #[test]
    fn test_parameters_before_attach() {
        let mut op = MetaOperation::new(Arc::new(valid()));

        assert_eq!(
            op.set_parameter("amount", 2.0),
            Err(GraphError::NotAttached("test:two-step".to_string()))
        );
        assert!(matches!(op.get_parameter("amount"), Err(GraphError::NotAttached(_))));
        assert!(matches!(
            op.get_parameter("nope"),
            Err(GraphError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_forwarding_reaches_stage() {
        let registry = FilterRegistry::with_builtins();
        let mut op = MetaOperation::new(Arc::new(valid()));
        op.attach(&registry).unwrap();

        assert_eq!(op.internal_parameter("amount").unwrap(), Value::Float(1.0));
        op.set_parameter("lift", 0.25).unwrap();
        assert_eq!(op.get_parameter("lift").unwrap(), 0.25);
        assert_eq!(op.internal_parameter("lift").unwrap(), Value::Float(0.25));

        let err = op.forward_parameter("lift", &Value::String("x".to_string()));
        assert!(matches!(err, Err(GraphError::InvalidParameter { .. })));
    }

    #[test]
    fn test_execute_requires_attach() {
        let op = MetaOperation::new(Arc::new(valid()));
        let mut ctx = ExecutionContext::new(NodeId::new());
        assert!(matches!(op.execute(&mut ctx), Err(ExecutionError::NotAttached(_))));
    }
}
