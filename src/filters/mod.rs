//! Filter module.
//!
//! Contains the filter registry, the primitive built-in filters and the
//! composite (meta) operations assembled from them.

pub mod registry;
pub mod builtin;
pub mod meta;

pub use registry::{FilterRegistry, FilterFactory};
