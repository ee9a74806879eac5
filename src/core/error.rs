//! Identifiers and error types.
//!
//! Each phase has its own `thiserror` enum: graph editing, validation,
//! execution, composite builds and presets. [`MetaopsError`] is the sum of
//! the ones the execution engine can raise.

use crate::core::types::PortType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        /// Short form: the first eight hex digits.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let hex = self.0.simple().to_string();
                f.write_str(&hex[..8])
            }
        }
    };
}

uuid_id!(
    /// Identity of a node within a graph.
    NodeId
);
uuid_id!(
    /// Identity of an edge within a graph.
    ConnectionId
);

pub type GraphResult<T> = Result<T, GraphError>;
pub type BuildResult<T> = Result<T, BuildError>;

/// Anything running a graph can fail with.
#[derive(Error, Debug)]
pub enum MetaopsError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Preset(#[from] PresetError),
}

/// Graph editing: adding edges, looking up nodes, writing parameters.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphError {
    #[error("no node {0} in graph")]
    NodeNotFound(NodeId),

    #[error("node {node_id} has no port '{port}'")]
    PortNotFound { node_id: NodeId, port: String },

    #[error("connection would close a cycle through {} node(s)", .nodes.len())]
    CycleDetected { nodes: Vec<NodeId> },

    #[error("cannot feed a {from_type} output into a {to_type} input")]
    TypeMismatch { from_type: PortType, to_type: PortType },

    #[error("input '{port}' of node {node_id} is already connected")]
    PortAlreadyConnected { node_id: NodeId, port: String },

    #[error("node {node_id} has no parameter '{parameter}'")]
    ParameterNotFound { node_id: NodeId, parameter: String },

    #[error("bad value for '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("'{operation}' exposes no parameter '{parameter}'")]
    UnknownParameter { operation: String, parameter: String },

    #[error("'{0}' is not attached")]
    NotAttached(String),
}

/// Problems found before anything runs.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("expected a {expected} value, got {got}")]
    TypeMismatch { expected: PortType, got: PortType },

    #[error("required input '{port}' of node {node_id} is not connected")]
    MissingRequiredInput { node_id: NodeId, port: String },

    #[error("node {node_id}, parameter '{parameter}': {error}")]
    ConstraintViolation {
        node_id: NodeId,
        parameter: String,
        error: String,
    },

    #[error("node {node_id}: {error}")]
    CustomValidation { node_id: NodeId, error: String },

    #[error("'{operation}' declares '{parameter}' badly: {error}")]
    InvalidDeclaration {
        operation: String,
        parameter: String,
        error: String,
    },

    #[error("graph contains a cycle")]
    CycleDetected,
}

impl ValidationError {
    /// Later checks are meaningless once this error is found.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationError::CycleDetected)
    }

    pub fn suggested_fix(&self) -> Option<String> {
        Some(match self {
            ValidationError::TypeMismatch { expected, .. } => format!("use a {} value", expected),
            ValidationError::MissingRequiredInput { port, .. } => {
                format!("connect an output to '{}'", port)
            }
            ValidationError::ConstraintViolation { parameter, .. } => {
                format!("change the value of '{}'", parameter)
            }
            ValidationError::InvalidDeclaration { parameter, .. } => {
                format!("fix the declaration of '{}'", parameter)
            }
            ValidationError::CustomValidation { .. } | ValidationError::CycleDetected => {
                return None
            }
        })
    }
}

/// Failures while a node runs.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("node {node_id} failed: {error}")]
    NodeExecution { node_id: NodeId, error: String },

    #[error("node {node_id} has no value on input '{port}'")]
    MissingInput { node_id: NodeId, port: String },

    #[error("node {node_id} has no value for parameter '{parameter}'")]
    MissingParameter { node_id: NodeId, parameter: String },

    #[error("node {node_id} produced nothing on '{port}'")]
    OutputNotSet { node_id: NodeId, port: String },

    #[error("'{0}' cannot run before it is attached")]
    NotAttached(String),
}

/// Failures while a composite builds its internal pipeline. The composite
/// stays unattached.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildError {
    #[error("no operation '{0}' is registered")]
    UnknownOperation(String),

    #[error("stage {stage} ('{operation}') has no parameter '{parameter}'")]
    UnknownInternalParameter {
        stage: usize,
        operation: String,
        parameter: String,
    },

    #[error("descriptor of '{operation}' is malformed: {reason}")]
    MalformedDescriptor { operation: String, reason: String },

    #[error("'{0}' is already attached")]
    AlreadyAttached(String),

    #[error("linking the pipeline failed: {0}")]
    Link(#[from] GraphError),
}

/// Reading, writing or applying a parameter preset.
#[derive(Error, Debug)]
pub enum PresetError {
    #[error("'{0}' is not a preset file (use .json or .toml)")]
    UnsupportedFormat(String),

    #[error("preset targets '{found}', expected '{expected}'")]
    WrongOperation { expected: String, found: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
