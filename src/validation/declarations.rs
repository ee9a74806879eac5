//! Checks on parameter declaration tables.
//!
//! These run against a filter's declared parameters rather than against the
//! values set on a graph node, so a bad table is caught when an operation is
//! registered or described instead of when a user first moves a slider.

use crate::core::error::ValidationError;
use crate::core::port::{Constraint, ParameterDefinition, UiHint};
use crate::validation::report::{finish, CheckResult, ValidationWarning};
use std::collections::HashSet;

/// Validate an operation's parameter table.
///
/// Errors: duplicate names, a default of the wrong type, a default outside
/// the valid range (bounds included), an inverted range, a UI range that
/// misses the valid range entirely, and a non-positive or non-finite UI
/// gamma. A UI range that reaches past the valid range is only a warning.
pub fn validate_parameter_table(
    operation: &str,
    parameters: &[ParameterDefinition],
) -> CheckResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    let mut invalid = |parameter: &str, error: String| {
        errors.push(ValidationError::InvalidDeclaration {
            operation: operation.to_string(),
            parameter: parameter.to_string(),
            error,
        });
    };

    for param in parameters {
        let name = param.name.as_str();

        if !seen.insert(name) {
            invalid(name, "declared more than once".to_string());
            continue;
        }

        if !param.param_type.matches(&param.default_value) {
            invalid(
                name,
                format!(
                    "default {} is not a {}",
                    param.default_value, param.param_type
                ),
            );
        }

        for constraint in &param.constraints {
            // Required strings default to empty.
            if matches!(constraint, Constraint::NotEmpty) {
                continue;
            }
            if let Err(reason) = constraint.check(&param.default_value) {
                invalid(name, format!("default rejected: {}", reason));
            }
        }

        let range = param.value_range();
        if let Some((min, max)) = range {
            if !(min <= max) {
                invalid(name, format!("valid range [{}, {}] is empty", min, max));
            }
        }

        if let Some((ui_min, ui_max)) = param.ui_range {
            if !(ui_min < ui_max) {
                invalid(name, format!("UI range [{}, {}] is empty", ui_min, ui_max));
            } else if let Some((min, max)) = range {
                if ui_max < min || ui_min > max {
                    invalid(
                        name,
                        format!(
                            "UI range [{}, {}] lies outside valid range [{}, {}]",
                            ui_min, ui_max, min, max
                        ),
                    );
                } else if ui_min < min || ui_max > max {
                    warnings.push(
                        ValidationWarning::new(format!(
                            "'{}' on '{}': UI range [{}, {}] extends past valid range [{}, {}]",
                            name, operation, ui_min, ui_max, min, max
                        ))
                        .suggest("slider ends will be clamped"),
                    );
                }
            }
        }

        if let UiHint::Slider { gamma } = param.ui_hint {
            if !(gamma.is_finite() && gamma > 0.0) {
                invalid(name, format!("UI gamma {} must be a positive number", gamma));
            }
        }
    }

    finish(warnings, errors)
}
