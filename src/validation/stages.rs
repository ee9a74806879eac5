//! The checks a [`ValidationPipeline`](crate::validation::ValidationPipeline)
//! runs, one concern per stage.

use crate::core::context::ValidationContext;
use crate::core::error::ValidationError;
use crate::graph::structure::{GraphNode, ProcessingGraph};
use crate::graph::topology::TopologyAnalyzer;
use crate::validation::declarations::validate_parameter_table;
use crate::validation::report::{finish, CheckResult, ValidationWarning};
use std::collections::HashSet;

pub trait ValidationStage: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, graph: &ProcessingGraph) -> CheckResult;
}

/// Links: no cycles, every required input connected.
///
/// Warns about empty graphs, disconnected pieces and disabled nodes that
/// still feed others.
pub struct StructuralValidation;

impl ValidationStage for StructuralValidation {
    fn name(&self) -> &str {
        "structure"
    }

    fn validate(&self, graph: &ProcessingGraph) -> CheckResult {
        if graph.is_empty() {
            return Ok(vec![ValidationWarning::new("graph is empty").suggest("add some nodes")]);
        }

        let analyzer = TopologyAnalyzer::new(graph);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if analyzer.has_cycle() {
            errors.push(ValidationError::CycleDetected);
        }

        for node in graph.nodes() {
            let unconnected = node
                .filter
                .metadata()
                .inputs
                .into_iter()
                .filter(|port| !port.optional && !graph.is_input_connected(node.id, &port.name));
            errors.extend(unconnected.map(|port| ValidationError::MissingRequiredInput {
                node_id: node.id,
                port: port.name,
            }));

            if node.disabled && graph.connections_from(node.id).next().is_some() {
                warnings.push(
                    ValidationWarning::new(format!(
                        "disabled node '{}' feeds other nodes",
                        node.display_name()
                    ))
                    .on_node(node.id)
                    .suggest("its consumers will get no input"),
                );
            }
        }

        let pieces = analyzer.components().len();
        if pieces > 1 {
            warnings.push(
                ValidationWarning::new(format!("graph falls apart into {} pieces", pieces))
                    .suggest("connect them or remove the unused nodes"),
            );
        }

        finish(warnings, errors)
    }
}

/// Each distinct operation's parameter table, checked once per graph.
pub struct DeclarationValidation;

impl ValidationStage for DeclarationValidation {
    fn name(&self) -> &str {
        "declarations"
    }

    fn validate(&self, graph: &ProcessingGraph) -> CheckResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for node in graph.nodes() {
            let metadata = node.filter.metadata();
            if seen.insert(metadata.id.clone()) {
                match validate_parameter_table(&metadata.id, &metadata.parameters) {
                    Ok(w) => warnings.extend(w),
                    Err(e) => errors.extend(e),
                }
            }
        }

        finish(warnings, errors)
    }
}

/// Effective parameter values against their declarations, then each
/// enabled node's own `validate`.
pub struct ConstraintValidation;

impl ConstraintValidation {
    fn check_node(node: &GraphNode, errors: &mut Vec<ValidationError>) {
        let metadata = node.filter.metadata();
        let mut ctx = ValidationContext::new(node.id);

        for (name, value) in node.effective_parameters() {
            if let Some(definition) = metadata.get_parameter(&name) {
                if let Err(error) = definition.validate(&value) {
                    errors.push(ValidationError::ConstraintViolation {
                        node_id: node.id,
                        parameter: name.clone(),
                        error,
                    });
                }
            }
            ctx.add_parameter(name, value);
        }

        if !node.disabled {
            if let Err(error) = node.filter.validate(&ctx) {
                errors.push(error);
            }
        }
    }
}

impl ValidationStage for ConstraintValidation {
    fn name(&self) -> &str {
        "constraints"
    }

    fn validate(&self, graph: &ProcessingGraph) -> CheckResult {
        let mut errors = Vec::new();
        for node in graph.nodes() {
            Self::check_node(node, &mut errors);
        }
        finish(Vec::new(), errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::ProxyNode;
    use crate::core::types::Value;
    use crate::filters::registry::FilterRegistry;

    #[test]
    fn test_empty_graph_warns() {
        let warnings = StructuralValidation.validate(&ProcessingGraph::new()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "graph is empty");
    }

    #[test]
    fn test_unconnected_required_input() {
        let mut graph = ProcessingGraph::new();
        let lone = graph.add_filter(Box::new(ProxyNode::Output));

        assert_eq!(
            StructuralValidation.validate(&graph).unwrap_err(),
            vec![ValidationError::MissingRequiredInput {
                node_id: lone,
                port: "input".to_string(),
            }]
        );
    }

    #[test]
    fn test_pieces_and_disabled_feeders_warn() {
        let mut graph = ProcessingGraph::new();
        let input = graph.add_filter(Box::new(ProxyNode::Input));
        let output = graph.add_filter(Box::new(ProxyNode::Output));
        graph.connect(input, "output", output, "input").unwrap();
        assert!(StructuralValidation.validate(&graph).unwrap().is_empty());

        graph.get_node_mut(input).unwrap().disabled = true;
        graph.add_filter(Box::new(ProxyNode::Input));

        let warnings = StructuralValidation.validate(&graph).unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].node_id, Some(input));
    }

    #[test]
    fn test_defaults_pass() {
        let registry = FilterRegistry::with_builtins();
        let mut graph = ProcessingGraph::new();
        graph.add_filter(registry.instantiate("metaops:brightness-contrast").unwrap());
        graph.add_filter(registry.instantiate("metaops:brightness-contrast").unwrap());

        assert!(ConstraintValidation.validate(&graph).is_ok());
        assert!(DeclarationValidation.validate(&graph).is_ok());
    }

    #[test]
    fn test_mistyped_value_is_caught() {
        let registry = FilterRegistry::with_builtins();
        let mut graph = ProcessingGraph::new();
        let id = graph.add_filter(registry.instantiate("metaops:saturation").unwrap());
        graph
            .get_node_mut(id)
            .unwrap()
            .set_parameter("scale", Value::String("lots".into()))
            .unwrap();

        let errors = ConstraintValidation.validate(&graph).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::ConstraintViolation { parameter, .. } if parameter == "scale"
        ));
    }

    #[test]
    fn test_nan_written_past_the_host_is_caught() {
        let registry = FilterRegistry::with_builtins();
        let mut graph = ProcessingGraph::new();
        let id = graph.add_filter(registry.instantiate("metaops:brightness-contrast").unwrap());
        graph
            .get_node_mut(id)
            .unwrap()
            .set_parameter("contrast", Value::Float(f64::NAN))
            .unwrap();

        let errors = ConstraintValidation.validate(&graph).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
