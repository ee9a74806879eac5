//! Ordering and shape queries over a [`ProcessingGraph`].

use crate::core::error::{GraphError, GraphResult, NodeId};
use crate::graph::structure::ProcessingGraph;
use std::collections::{HashMap, HashSet};

/// Read-only analysis of a graph's links.
pub struct TopologyAnalyzer<'a> {
    graph: &'a ProcessingGraph,
}

impl<'a> TopologyAnalyzer<'a> {
    pub fn new(graph: &'a ProcessingGraph) -> Self {
        Self { graph }
    }

    /// Nodes grouped by depth, the length of the longest path reaching
    /// them. No node depends on another in its own batch; within a batch
    /// nodes keep insertion order.
    pub fn parallel_batches(&self) -> GraphResult<Vec<Vec<NodeId>>> {
        let graph = self.graph;
        let mut waiting: HashMap<NodeId, usize> = graph
            .node_ids()
            .map(|id| (id, graph.connections_to(id).count()))
            .collect();
        let mut ready: Vec<NodeId> = graph.node_ids().filter(|id| waiting[id] == 0).collect();
        let mut depth: HashMap<NodeId, usize> = HashMap::new();
        let mut visited = 0;

        while let Some(id) = ready.pop() {
            visited += 1;
            let next_depth = *depth.entry(id).or_insert(0) + 1;
            for conn in graph.connections_from(id) {
                let child = conn.to.node_id;
                let d = depth.entry(child).or_insert(0);
                *d = (*d).max(next_depth);
                if let Some(count) = waiting.get_mut(&child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(child);
                    }
                }
            }
        }

        if visited < graph.node_count() {
            let stuck = graph.node_ids().filter(|id| waiting[id] > 0).collect();
            return Err(GraphError::CycleDetected { nodes: stuck });
        }

        let mut batches: Vec<Vec<NodeId>> = Vec::new();
        for id in graph.node_ids() {
            let d = depth[&id];
            if batches.len() <= d {
                batches.resize_with(d + 1, Vec::new);
            }
            batches[d].push(id);
        }
        Ok(batches)
    }

    /// An order in which every node comes after all of its inputs.
    pub fn topological_sort(&self) -> GraphResult<Vec<NodeId>> {
        Ok(self.parallel_batches()?.into_iter().flatten().collect())
    }

    pub fn has_cycle(&self) -> bool {
        self.parallel_batches().is_err()
    }

    /// Weakly connected pieces of the graph, in insertion order of their
    /// first node.
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        let mut assigned = HashSet::new();
        let mut components = Vec::new();

        for start in self.graph.node_ids() {
            if assigned.contains(&start) {
                continue;
            }
            let mut members = Vec::new();
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                if !assigned.insert(id) {
                    continue;
                }
                members.push(id);
                let downstream = self.graph.connections_from(id).map(|c| c.to.node_id);
                let upstream = self.graph.connections_to(id).map(|c| c.from.node_id);
                stack.extend(downstream.chain(upstream));
            }
            components.push(members);
        }

        components
    }

    /// Node order of the graph if it is one simple path.
    ///
    /// `None` when the graph is empty, branches, merges or is split into
    /// several pieces.
    pub fn linear_chain(&self) -> Option<Vec<NodeId>> {
        let count = self.graph.node_count();
        if count == 0 || self.graph.connection_count() != count - 1 {
            return None;
        }

        let sources = self.graph.get_source_nodes();
        let [start] = sources.as_slice() else {
            return None;
        };

        let mut chain = Vec::with_capacity(count);
        let mut current = *start;
        loop {
            chain.push(current);
            let mut next = self.graph.connections_from(current);
            match (next.next(), next.next()) {
                (None, _) => break,
                (Some(conn), None) => current = conn.to.node_id,
                (Some(_), Some(_)) => return None,
            }
            if chain.len() > count {
                return None;
            }
        }

        (chain.len() == count).then_some(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::ProxyNode;

    fn chain(graph: &mut ProcessingGraph, len: usize) -> Vec<NodeId> {
        let ids: Vec<_> = (0..len)
            .map(|_| graph.add_filter(Box::new(ProxyNode::Output)))
            .collect();
        graph.connect_chain(&ids).unwrap();
        ids
    }

    #[test]
    fn test_chain_sorts_in_link_order() {
        let mut graph = ProcessingGraph::new();
        let ids = chain(&mut graph, 3);

        assert_eq!(TopologyAnalyzer::new(&graph).topological_sort().unwrap(), ids);
    }

    #[test]
    fn test_batches_follow_longest_path() {
        let mut graph = ProcessingGraph::new();
        let ids = chain(&mut graph, 3);
        let lone = graph.add_filter(Box::new(ProxyNode::Input));

        let batches = TopologyAnalyzer::new(&graph).parallel_batches().unwrap();
        assert_eq!(batches, vec![vec![ids[0], lone], vec![ids[1]], vec![ids[2]]]);
    }

    #[test]
    fn test_components() {
        let mut graph = ProcessingGraph::new();
        let first = chain(&mut graph, 2);
        chain(&mut graph, 3);

        let analyzer = TopologyAnalyzer::new(&graph);
        let components = analyzer.components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], first);
        assert_eq!(components[1].len(), 3);
        assert!(!analyzer.has_cycle());
    }

    #[test]
    fn test_linear_chain() {
        let mut graph = ProcessingGraph::new();
        let ids = chain(&mut graph, 7);

        assert_eq!(TopologyAnalyzer::new(&graph).linear_chain(), Some(ids));
    }

    #[test]
    fn test_linear_chain_rejects_branches_and_pieces() {
        let mut split = ProcessingGraph::new();
        chain(&mut split, 2);
        chain(&mut split, 2);
        assert_eq!(TopologyAnalyzer::new(&split).linear_chain(), None);

        let mut branch = ProcessingGraph::new();
        let root = chain(&mut branch, 2)[0];
        let right = branch.add_filter(Box::new(ProxyNode::Output));
        branch.connect(root, "output", right, "input").unwrap();
        assert_eq!(TopologyAnalyzer::new(&branch).linear_chain(), None);

        assert_eq!(TopologyAnalyzer::new(&ProcessingGraph::new()).linear_chain(), None);
    }
}
