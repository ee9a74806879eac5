//! Checks that run before any pixels are touched.
//!
//! Graph checks are grouped into stages run by [`ValidationPipeline`];
//! [`validate_parameter_table`] checks a single operation's declarations.

pub mod declarations;
pub mod pipeline;
pub mod report;
pub mod stages;

pub use declarations::validate_parameter_table;
pub use pipeline::ValidationPipeline;
pub use report::{CheckResult, ValidationReport, ValidationWarning};
pub use stages::{ConstraintValidation, DeclarationValidation, StructuralValidation, ValidationStage};
