//! Runs a graph in dependency order.
//!
//! Nodes are grouped into batches of mutually independent nodes; with
//! `parallel` set, each batch is spread over rayon's thread pool.

use crate::core::context::ExecutionContext;
use crate::core::error::{ExecutionError, MetaopsError, NodeId};
use crate::core::types::Value;
use crate::graph::structure::ProcessingGraph;
use crate::graph::topology::TopologyAnalyzer;
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Port values of many nodes: node, then port name.
pub type NodeValues = HashMap<NodeId, HashMap<String, Value>>;

#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Run independent nodes concurrently.
    pub parallel: bool,
    /// Abort on the first failing node instead of collecting failures.
    pub stop_on_error: bool,
    /// Treat disabled nodes as producing nothing.
    pub skip_disabled: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            stop_on_error: true,
            skip_disabled: true,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// One node at a time, in topological order.
    pub fn sequential() -> Self {
        Self::default().with_parallel(false)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn with_skip_disabled(mut self, skip: bool) -> Self {
        self.skip_disabled = skip;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    pub total_duration: Duration,
    pub nodes_executed: usize,
    pub nodes_skipped: usize,
}

#[derive(Debug)]
pub struct ExecutionResult {
    /// Outputs of the sink nodes only.
    pub outputs: NodeValues,
    /// Outputs of every node that ran.
    pub all_outputs: NodeValues,
    pub stats: ExecutionStats,
    /// Failures collected when `stop_on_error` is off.
    pub errors: Vec<(NodeId, ExecutionError)>,
}

impl ExecutionResult {
    /// Output `port` of `node_id`, if it ran and produced one.
    pub fn output(&self, node_id: NodeId, port: &str) -> Option<&Value> {
        self.all_outputs.get(&node_id)?.get(port)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    default_options: ExecutionOptions,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options used when a call passes `None`.
    pub fn with_default_options(mut self, options: ExecutionOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn execute(
        &self,
        graph: &ProcessingGraph,
        options: Option<ExecutionOptions>,
    ) -> Result<ExecutionResult, MetaopsError> {
        self.execute_with_inputs(graph, &NodeValues::new(), options)
    }

    /// Run `graph` with values supplied from outside.
    ///
    /// `inputs` fills input ports that no link feeds; a linked port always
    /// takes the upstream value.
    pub fn execute_with_inputs(
        &self,
        graph: &ProcessingGraph,
        inputs: &NodeValues,
        options: Option<ExecutionOptions>,
    ) -> Result<ExecutionResult, MetaopsError> {
        let options = options.unwrap_or_else(|| self.default_options.clone());
        let started = Instant::now();
        let analyzer = TopologyAnalyzer::new(graph);

        let batches = if options.parallel {
            analyzer.parallel_batches()?
        } else {
            analyzer.topological_sort()?.into_iter().map(|id| vec![id]).collect()
        };
        log::info!(
            "running '{}': {} node(s) in {} batch(es)",
            graph.name.as_deref().unwrap_or("graph"),
            graph.node_count(),
            batches.len()
        );

        let mut produced = NodeValues::new();
        let mut stats = ExecutionStats::default();
        let mut errors = Vec::new();

        for batch in batches {
            let run = |&id: &NodeId| (id, run_node(graph, id, &produced, inputs, &options));
            let finished: Vec<_> = if options.parallel && batch.len() > 1 {
                batch.par_iter().map(run).collect()
            } else {
                batch.iter().map(run).collect()
            };

            for (id, outcome) in finished {
                match outcome {
                    Ok(Some(outputs)) => {
                        stats.nodes_executed += 1;
                        produced.insert(id, outputs);
                    }
                    Ok(None) => {
                        stats.nodes_skipped += 1;
                        produced.insert(id, HashMap::new());
                    }
                    Err(error) if options.stop_on_error => {
                        log::error!("node {} failed: {}", id, error);
                        return Err(error.into());
                    }
                    Err(error) => {
                        log::warn!("node {} failed, continuing: {}", id, error);
                        errors.push((id, error));
                    }
                }
            }
        }

        stats.total_duration = started.elapsed();
        log::info!(
            "finished in {:?}: {} ran, {} skipped, {} failed",
            stats.total_duration,
            stats.nodes_executed,
            stats.nodes_skipped,
            errors.len()
        );

        let outputs = graph
            .get_sink_nodes()
            .into_iter()
            .filter_map(|id| Some((id, produced.get(&id)?.clone())))
            .collect();

        Ok(ExecutionResult {
            outputs,
            all_outputs: produced,
            stats,
            errors,
        })
    }
}

/// Run one node. `Ok(None)` means it was skipped.
fn run_node(
    graph: &ProcessingGraph,
    id: NodeId,
    produced: &NodeValues,
    external: &NodeValues,
    options: &ExecutionOptions,
) -> Result<Option<HashMap<String, Value>>, ExecutionError> {
    let node = graph.get_node(id).map_err(|e| ExecutionError::NodeExecution {
        node_id: id,
        error: e.to_string(),
    })?;
    if options.skip_disabled && node.disabled {
        log::debug!("skipping disabled node {}", id);
        return Ok(None);
    }

    let mut ctx = ExecutionContext::new(id);
    if let Some(values) = external.get(&id) {
        for (port, value) in values {
            if !graph.is_input_connected(id, port) {
                ctx.add_input(port.clone(), value.clone());
            }
        }
    }
    for link in graph.connections_to(id) {
        let upstream = produced
            .get(&link.from.node_id)
            .and_then(|outputs| outputs.get(&link.from.port_name));
        if let Some(value) = upstream {
            ctx.add_input(link.to.port_name.clone(), value.clone());
        }
    }
    for (name, value) in node.effective_parameters() {
        ctx.add_parameter(name, value);
    }

    log::debug!("running node {} ({})", id, node.display_name());
    node.filter.execute(&mut ctx)?;
    Ok(Some(ctx.take_outputs()))
}
