//! # metaops - composite image operations
//!
//! metaops builds composite ("meta") filters for a node-based image
//! processing graph. A composite hides a fixed chain of primitive stage
//! filters behind one node and exposes a flat parameter table whose
//! entries write through to the stages' own parameters.
//!
//! The crate ships the graph host the composites run in: a filter trait,
//! a registry, a processing graph, a validation pipeline and an execution
//! engine, together with the primitive colour, tone and sharpening stages.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metaops::prelude::*;
//!
//! let registry = FilterRegistry::with_builtins();
//! let mut graph = ProcessingGraph::new();
//!
//! let load = graph.add_filter(registry.instantiate("metaops:load-image").unwrap());
//! graph.set_parameter(load, "path", Value::String("input.png".to_string())).unwrap();
//!
//! let adjust = graph.add_filter(registry.instantiate("metaops:common-adjustments").unwrap());
//! graph.set_parameter(adjust, "scale", Value::Float(1.3)).unwrap();
//! graph.set_parameter(adjust, "it", Value::Float(5500.0)).unwrap();
//!
//! let save = graph.add_filter(registry.instantiate("metaops:save-image").unwrap());
//! graph.set_parameter(save, "path", Value::String("output.png".to_string())).unwrap();
//!
//! graph.connect_chain(&[load, adjust, save]).unwrap();
//!
//! let report = ValidationPipeline::default().validate(&graph);
//! assert!(report.can_execute());
//!
//! ExecutionEngine::new().execute(&graph, None).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: values, ports, parameter declarations, the [`FilterNode`](core::FilterNode) trait, errors
//! - [`graph`]: graph structure and topology analysis
//! - [`validation`]: declaration checks and the pre-execution pipeline
//! - [`execution`]: sequential and parallel graph execution
//! - [`filters`]: registry, built-in stages and composite operations

#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod filters;
pub mod graph;
pub mod validation;

/// The types most callers need.
pub mod prelude {
    pub use crate::core::context::{ExecutionContext, ValidationContext};
    pub use crate::core::error::{
        BuildError, ExecutionError, GraphError, MetaopsError, NodeId, PresetError,
        ValidationError,
    };
    pub use crate::core::node::{Category, FilterNode, NodeMetadata, ProxyNode};
    pub use crate::core::port::{Constraint, ParameterDefinition, PortDefinition, UiHint};
    pub use crate::core::types::{ImageValue, PortType, Value};
    pub use crate::execution::{ExecutionEngine, ExecutionOptions, ExecutionResult, NodeValues};
    pub use crate::filters::registry::FilterRegistry;
    pub use crate::graph::{Connection, Endpoint, GraphNode, ProcessingGraph, TopologyAnalyzer};
    pub use crate::validation::{
        validate_parameter_table, ValidationPipeline, ValidationReport, ValidationWarning,
    };

    pub use crate::filters::meta::{
        AdjustmentParam, CommonAdjustments, MetaDescriptor, MetaOperation, ParameterPreset,
        Redirect, Stage,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
