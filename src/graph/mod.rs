//! Processing graphs: filter nodes joined by port-to-port links.
//!
//! Graphs are acyclic by construction; [`ProcessingGraph::connect`] refuses
//! any link that would close a loop.

pub mod connection;
pub mod structure;
pub mod topology;

pub use connection::{Connection, Endpoint};
pub use structure::{GraphNode, ProcessingGraph};
pub use topology::TopologyAnalyzer;
