//! Per-node contexts handed to `validate` and `execute`.

use crate::core::error::{ExecutionError, NodeId, ValidationError};
use crate::core::types::{ImageValue, PortType, Value};
use std::collections::HashMap;

/// What a node sees while it is being validated: its effective parameters.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub node_id: NodeId,
    parameters: HashMap<String, Value>,
}

impl ValidationContext {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            parameters: HashMap::new(),
        }
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn get_parameter(&self, name: &str) -> Result<&Value, ValidationError> {
        self.parameters
            .get(name)
            .ok_or_else(|| ValidationError::ConstraintViolation {
                node_id: self.node_id,
                parameter: name.to_string(),
                error: "not set".to_string(),
            })
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: PortType,
        read: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, ValidationError> {
        let value = self.get_parameter(name)?;
        read(value).ok_or(ValidationError::TypeMismatch {
            expected,
            got: value.port_type(),
        })
    }

    pub fn get_float(&self, name: &str) -> Result<f64, ValidationError> {
        self.typed(name, PortType::Float, Value::as_float)
    }

    pub fn get_string(&self, name: &str) -> Result<&str, ValidationError> {
        self.typed(name, PortType::String, Value::as_string)
    }
}

/// Inputs and parameters going into `execute`, and the outputs coming out.
#[derive(Debug)]
pub struct ExecutionContext {
    pub node_id: NodeId,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            inputs: HashMap::new(),
            parameters: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    pub fn add_input(&mut self, name: impl Into<String>, value: Value) {
        self.inputs.insert(name.into(), value);
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn take_outputs(self) -> HashMap<String, Value> {
        self.outputs
    }

    fn failed(&self, error: String) -> ExecutionError {
        ExecutionError::NodeExecution {
            node_id: self.node_id,
            error,
        }
    }

    pub fn get_input(&self, name: &str) -> Result<&Value, ExecutionError> {
        self.inputs.get(name).ok_or_else(|| ExecutionError::MissingInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    pub fn get_input_image(&self, name: &str) -> Result<&ImageValue, ExecutionError> {
        let value = self.get_input(name)?;
        value
            .as_image()
            .ok_or_else(|| self.failed(format!("input '{}' holds {}, not an image", name, value)))
    }

    pub fn take_input(&mut self, name: &str) -> Result<Value, ExecutionError> {
        self.inputs.remove(name).ok_or_else(|| ExecutionError::MissingInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    pub fn get_parameter(&self, name: &str) -> Result<&Value, ExecutionError> {
        self.parameters
            .get(name)
            .ok_or_else(|| ExecutionError::MissingParameter {
                node_id: self.node_id,
                parameter: name.to_string(),
            })
    }

    pub fn get_float(&self, name: &str) -> Result<f64, ExecutionError> {
        let value = self.get_parameter(name)?;
        value
            .as_float()
            .ok_or_else(|| self.failed(format!("parameter '{}' = {} is not numeric", name, value)))
    }

    pub fn get_string(&self, name: &str) -> Result<&str, ExecutionError> {
        let value = self.get_parameter(name)?;
        value
            .as_string()
            .ok_or_else(|| self.failed(format!("parameter '{}' = {} is not a string", name, value)))
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: Value) -> Result<(), ExecutionError> {
        self.outputs.insert(name.into(), value);
        Ok(())
    }

    pub fn set_output_image(&mut self, name: impl Into<String>, image: ImageValue) -> Result<(), ExecutionError> {
        self.set_output(name, Value::Image(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_parameter_reads() {
        let mut ctx = ValidationContext::new(NodeId::new());
        ctx.add_parameter("std-dev", Value::Float(5.0));

        assert_eq!(ctx.get_float("std-dev").unwrap(), 5.0);
        assert_eq!(
            ctx.get_string("std-dev"),
            Err(ValidationError::TypeMismatch {
                expected: PortType::String,
                got: PortType::Float,
            })
        );
        assert!(ctx.get_float("scale").is_err());
    }

    #[test]
    fn test_inputs_and_outputs() {
        let mut ctx = ExecutionContext::new(NodeId::new());
        assert!(matches!(
            ctx.get_input_image("input"),
            Err(ExecutionError::MissingInput { .. })
        ));

        ctx.add_input("input", Value::Float(1.0));
        assert!(matches!(
            ctx.get_input_image("input"),
            Err(ExecutionError::NodeExecution { .. })
        ));
        assert_eq!(ctx.take_input("input").unwrap(), Value::Float(1.0));
        assert!(ctx.get_input("input").is_err());

        ctx.set_output("output", Value::Integer(100)).unwrap();
        assert_eq!(ctx.take_outputs().get("output"), Some(&Value::Integer(100)));
    }
}
