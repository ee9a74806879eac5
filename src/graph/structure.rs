//! Nodes, links and the graph that holds them.
//!
//! The same [`ProcessingGraph`] serves as a user pipeline and as the
//! private pipeline inside a composite node.

use crate::core::error::{ConnectionId, GraphError, GraphResult, NodeId};
use crate::core::node::FilterNode;
use crate::core::types::Value;
use crate::graph::connection::{Connection, Endpoint};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// A filter placed in a graph, with its parameter overrides.
#[derive(Clone)]
pub struct GraphNode {
    pub id: NodeId,
    pub filter: Box<dyn FilterNode>,
    /// Values written since creation; anything absent uses the declared default.
    overrides: HashMap<String, Value>,
    /// Disabled nodes are skipped by the engine.
    pub disabled: bool,
}

impl std::fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("operation", &self.filter.metadata().id)
            .field("overrides", &self.overrides)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl GraphNode {
    pub fn new(filter: Box<dyn FilterNode>) -> Self {
        Self {
            id: NodeId::new(),
            filter,
            overrides: HashMap::new(),
            disabled: false,
        }
    }

    /// The filter's display name.
    pub fn display_name(&self) -> String {
        self.filter.metadata().name
    }

    /// Parameters written on this node, without defaults.
    pub fn parameters(&self) -> &HashMap<String, Value> {
        &self.overrides
    }

    /// The effective value of a parameter: the override, else the default.
    ///
    /// `None` when the filter declares no such parameter.
    pub fn get_parameter(&self, name: &str) -> Option<Value> {
        match self.overrides.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .filter
                .metadata()
                .get_parameter(name)
                .map(|def| def.default_value.clone()),
        }
    }

    /// Every declared parameter with its effective value, in declaration
    /// order.
    pub fn effective_parameters(&self) -> Vec<(String, Value)> {
        self.filter
            .metadata()
            .parameters
            .into_iter()
            .map(|def| {
                let value = self
                    .overrides
                    .get(&def.name)
                    .cloned()
                    .unwrap_or(def.default_value);
                (def.name, value)
            })
            .collect()
    }

    /// Store a value after the filter's forwarding hook accepts it.
    ///
    /// No range clamping happens here; see [`ProcessingGraph::set_parameter`].
    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value) -> GraphResult<()> {
        let name = name.into();
        self.filter.forward_parameter(&name, &value)?;
        self.overrides.insert(name, value);
        Ok(())
    }
}

/// A directed acyclic graph of filter nodes.
///
/// Nodes iterate in insertion order, which keeps execution order stable
/// between runs.
#[derive(Debug, Clone, Default)]
pub struct ProcessingGraph {
    nodes: IndexMap<NodeId, GraphNode>,
    connections: Vec<Connection>,
    /// Shown in logs.
    pub name: Option<String>,
}

impl ProcessingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Wrap a filter in a fresh node and add it.
    pub fn add_filter(&mut self, filter: Box<dyn FilterNode>) -> NodeId {
        self.add_node(GraphNode::new(filter))
    }

    pub fn get_node(&self, id: NodeId) -> GraphResult<&GraphNode> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> GraphResult<&mut GraphNode> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Write a parameter through the node's declaration.
    ///
    /// This is the host's property path: the value must have the declared
    /// type, floats must be finite, and numbers are clamped into the declared valid range before the node
    /// (and any composite behind it) sees it.
    pub fn set_parameter(&mut self, node_id: NodeId, name: &str, value: Value) -> GraphResult<()> {
        let node = self.get_node_mut(node_id)?;
        let metadata = node.filter.metadata();
        let Some(definition) = metadata.get_parameter(name) else {
            return Err(GraphError::ParameterNotFound {
                node_id,
                parameter: name.to_string(),
            });
        };

        if !definition.param_type.matches(&value) {
            return Err(GraphError::InvalidParameter {
                parameter: name.to_string(),
                reason: format!("expected {}, got {}", definition.param_type, value.port_type()),
            });
        }

        if matches!(value, Value::Float(v) if !v.is_finite()) {
            return Err(GraphError::InvalidParameter {
                parameter: name.to_string(),
                reason: format!("{} is not a finite number", value),
            });
        }

        let value = definition.clamp(value);
        log::debug!("node {}: {} = {}", node_id, name, value);
        node.set_parameter(name, value)
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Link an output port to an input port.
    ///
    /// Fails if either port is missing, the types are incompatible, the
    /// input already has a link, or the link would close a cycle.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: impl Into<String>,
        to_node: NodeId,
        to_port: impl Into<String>,
    ) -> GraphResult<ConnectionId> {
        let (from_port, to_port) = (from_port.into(), to_port.into());
        let source = self.get_node(from_node)?.filter.metadata();
        let target = self.get_node(to_node)?.filter.metadata();

        let missing = |node_id, port: &str| GraphError::PortNotFound {
            node_id,
            port: port.to_string(),
        };
        let out_type = source
            .get_output(&from_port)
            .ok_or_else(|| missing(from_node, &from_port))?
            .port_type;
        let in_type = target
            .get_input(&to_port)
            .ok_or_else(|| missing(to_node, &to_port))?
            .port_type;

        if !in_type.accepts(out_type) {
            return Err(GraphError::TypeMismatch {
                from_type: out_type,
                to_type: in_type,
            });
        }
        if self.is_input_connected(to_node, &to_port) {
            return Err(GraphError::PortAlreadyConnected {
                node_id: to_node,
                port: to_port,
            });
        }
        if self.is_reachable(to_node, from_node) {
            return Err(GraphError::CycleDetected {
                nodes: vec![from_node, to_node],
            });
        }

        let connection = Connection::new(
            Endpoint::new(from_node, from_port),
            Endpoint::new(to_node, to_port),
        );
        let id = connection.id;
        self.connections.push(connection);
        Ok(id)
    }

    /// Link each node's `output` port to the next node's `input` port.
    pub fn connect_chain(&mut self, chain: &[NodeId]) -> GraphResult<()> {
        for pair in chain.windows(2) {
            self.connect(pair[0], "output", pair[1], "input")?;
        }
        Ok(())
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connections_from(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.from.node_id == node_id)
    }

    pub fn connections_to(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.to.node_id == node_id)
    }

    pub fn is_input_connected(&self, node_id: NodeId, port: &str) -> bool {
        self.connections_to(node_id).any(|c| c.to.port_name == port)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ========================================================================
    // Shape
    // ========================================================================

    /// Whether `target` can be reached from `start` along links.
    pub fn is_reachable(&self, start: NodeId, target: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.connections_from(current).map(|c| c.to.node_id));
            }
        }
        false
    }

    /// Nodes nothing links into, in insertion order.
    pub fn get_source_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| self.connections_to(id).next().is_none())
            .collect()
    }

    /// Nodes that link nowhere, in insertion order.
    pub fn get_sink_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| self.connections_from(id).next().is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{Category, NodeMetadata, ProxyNode};
    use crate::core::port::{ParameterDefinition, PortDefinition};
    use crate::core::types::PortType;
    use crate::core::{ExecutionContext, ExecutionError, ValidationContext, ValidationError};
    use std::sync::{Arc, Mutex};

    fn proxy() -> Box<dyn FilterNode> {
        Box::new(ProxyNode::Output)
    }

    /// Records every forwarded write.
    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl FilterNode for Recorder {
        fn metadata(&self) -> NodeMetadata {
            NodeMetadata::builder("test:recorder", "Recorder")
                .category(Category::Utility)
                .input(PortDefinition::input("input", PortType::Image))
                .output(PortDefinition::output("output", PortType::Image))
                .parameter(ParameterDefinition::float("contrast", 1.0).with_range(-5.0, 5.0))
                .build()
        }

        fn validate(&self, _ctx: &ValidationContext) -> Result<(), ValidationError> {
            Ok(())
        }

        fn execute(&self, _ctx: &mut ExecutionContext) -> Result<(), ExecutionError> {
            Ok(())
        }

        fn forward_parameter(&mut self, name: &str, value: &Value) -> GraphResult<()> {
            self.seen.lock().unwrap().push((name.to_string(), value.clone()));
            Ok(())
        }

        fn clone_box(&self) -> Box<dyn FilterNode> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn test_connect_chain() {
        let mut graph = ProcessingGraph::new();
        let ids: Vec<_> = (0..4).map(|_| graph.add_filter(proxy())).collect();

        graph.connect_chain(&ids).unwrap();
        assert_eq!(graph.connection_count(), 3);
        assert_eq!(graph.get_source_nodes(), vec![ids[0]]);
        assert_eq!(graph.get_sink_nodes(), vec![ids[3]]);
    }

    #[test]
    fn test_port_already_connected() {
        let mut graph = ProcessingGraph::new();
        let a = graph.add_filter(proxy());
        let b = graph.add_filter(proxy());

        graph.connect(a, "output", b, "input").unwrap();
        let again = graph.connect(a, "output", b, "input");
        assert!(matches!(again, Err(GraphError::PortAlreadyConnected { .. })));
    }

    #[test]
    fn test_connect_unknown_port() {
        let mut graph = ProcessingGraph::new();
        let a = graph.add_filter(proxy());
        let b = graph.add_filter(proxy());

        let result = graph.connect(a, "result", b, "input");
        assert!(matches!(result, Err(GraphError::PortNotFound { .. })));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = ProcessingGraph::new();
        let ids: Vec<_> = (0..3).map(|_| graph.add_filter(proxy())).collect();
        graph.connect_chain(&ids).unwrap();

        let result = graph.connect(ids[2], "output", ids[0], "input");
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
        assert_eq!(graph.connection_count(), 2);
    }

    #[test]
    fn test_set_parameter_clamps_and_forwards() {
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let mut graph = ProcessingGraph::new();
        let id = graph.add_filter(Box::new(recorder));

        graph.set_parameter(id, "contrast", Value::Float(9.0)).unwrap();

        let node = graph.get_node(id).unwrap();
        assert_eq!(node.get_parameter("contrast"), Some(Value::Float(5.0)));
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[("contrast".to_string(), Value::Float(5.0))]
        );
    }

    #[test]
    fn test_set_parameter_rejects_unknown_and_mistyped() {
        let mut graph = ProcessingGraph::new();
        let id = graph.add_filter(Box::new(Recorder::default()));

        let unknown = graph.set_parameter(id, "gamma", Value::Float(1.0));
        assert!(matches!(unknown, Err(GraphError::ParameterNotFound { .. })));

        let mistyped = graph.set_parameter(id, "contrast", Value::String("high".into()));
        assert!(matches!(mistyped, Err(GraphError::InvalidParameter { .. })));

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = graph.set_parameter(id, "contrast", Value::Float(bad));
            assert!(matches!(result, Err(GraphError::InvalidParameter { .. })), "{}", bad);
        }

        let node = graph.get_node(id).unwrap();
        assert!(node.parameters().is_empty());
        assert_eq!(node.get_parameter("contrast"), Some(Value::Float(1.0)));
        assert_eq!(
            node.effective_parameters(),
            vec![("contrast".to_string(), Value::Float(1.0))]
        );
    }
}
