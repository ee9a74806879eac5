//! Validation findings.

use crate::core::error::{NodeId, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What one check returns: warnings if it passed, errors if it did not.
pub type CheckResult = Result<Vec<ValidationWarning>, Vec<ValidationError>>;

/// A finding that does not block execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub message: String,
    pub node_id: Option<NodeId>,
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            node_id: None,
            suggestion: None,
        }
    }

    pub fn on_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Everything the validation pipeline found in one graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub elapsed: Duration,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_execute(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold one check into the report. Returns true when one of its errors
    /// is fatal.
    pub fn absorb(&mut self, result: CheckResult) -> bool {
        match result {
            Ok(warnings) => {
                self.warnings.extend(warnings);
                false
            }
            Err(errors) => {
                let fatal = errors.iter().any(ValidationError::is_fatal);
                self.errors.extend(errors);
                fatal
            }
        }
    }

    /// One numbered line per error, each followed by its suggested fix.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .zip(1..)
            .map(|(error, n)| match error.suggested_fix() {
                Some(fix) => format!("{}. {} ({})", n, error, fix),
                None => format!("{}. {}", n, error),
            })
            .collect()
    }
}

/// Collapse collected findings into a [`CheckResult`].
pub fn finish(warnings: Vec<ValidationWarning>, errors: Vec<ValidationError>) -> CheckResult {
    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb() {
        let mut report = ValidationReport::new();

        assert!(!report.absorb(Ok(vec![ValidationWarning::new("empty").suggest("add nodes")])));
        assert!(report.can_execute());
        assert_eq!(report.warnings[0].suggestion.as_deref(), Some("add nodes"));

        assert!(report.absorb(Err(vec![ValidationError::CycleDetected])));
        assert!(!report.can_execute());
        assert_eq!(report.detailed_errors(), vec!["1. graph contains a cycle"]);
    }
}
