//! Execution engine module.
//!
//! This module handles the actual execution of filter graphs.

pub mod engine;

pub use engine::{ExecutionEngine, ExecutionOptions, ExecutionResult, ExecutionStats, NodeValues};
