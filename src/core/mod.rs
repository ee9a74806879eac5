//! Building blocks shared by every other module: values, declarations,
//! the node trait, contexts and errors.

pub mod context;
pub mod error;
pub mod node;
pub mod port;
pub mod types;

pub use context::{ExecutionContext, ValidationContext};
pub use error::{BuildError, ExecutionError, GraphError, MetaopsError, PresetError, ValidationError};
pub use node::{Category, FilterNode, NodeMetadata, ProxyNode};
pub use port::{Constraint, ParameterDefinition, PortDefinition, UiHint};
pub use types::{ImageValue, PortType, Value};
