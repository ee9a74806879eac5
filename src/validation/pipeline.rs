//! Ordered validation checks over a whole graph.

use crate::graph::structure::ProcessingGraph;
use crate::validation::report::ValidationReport;
use crate::validation::stages::{
    ConstraintValidation, DeclarationValidation, StructuralValidation, ValidationStage,
};
use std::time::Instant;

/// Runs its stages in order and stops after a fatal error.
pub struct ValidationPipeline {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ValidationPipeline {
    pub fn new(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    pub fn add_stage(&mut self, stage: Box<dyn ValidationStage>) {
        self.stages.push(stage);
    }

    pub fn validate(&self, graph: &ProcessingGraph) -> ValidationReport {
        let start = Instant::now();
        let mut report = ValidationReport::new();

        for stage in &self.stages {
            let fatal = report.absorb(stage.validate(graph));
            log::debug!(
                "{}: {} error(s) so far",
                stage.name(),
                report.errors.len()
            );
            if fatal {
                break;
            }
        }

        report.elapsed = start.elapsed();
        report
    }
}

/// Structure, then declarations, then values.
impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StructuralValidation),
            Box::new(DeclarationValidation),
            Box::new(ConstraintValidation),
        ])
    }
}
