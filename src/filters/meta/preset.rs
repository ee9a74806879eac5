//! Parameter presets for composite operations.
//!
//! A preset stores the exposed parameter values of one operation. It is
//! written as JSON or TOML, picked by the file extension.

use super::MetaOperation;
use crate::core::error::{GraphError, NodeId, PresetError};
use crate::core::node::NodeMetadata;
use crate::core::types::Value;
use crate::graph::ProcessingGraph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

const PRESET_VERSION: u32 = 1;

/// On-disk preset encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    Json,
    Toml,
}

impl PresetFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, PresetError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(PresetFormat::Json),
            "toml" => Ok(PresetFormat::Toml),
            other => Err(PresetError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Saved exposed parameter values for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterPreset {
    pub version: u32,
    /// Operation id the values belong to.
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parameters: IndexMap<String, f64>,
}

impl ParameterPreset {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            version: PRESET_VERSION,
            operation: operation.into(),
            name: None,
            parameters: IndexMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, parameter: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(parameter.into(), value);
        self
    }

    /// Capture the current values of an attached operation.
    pub fn from_operation(operation: &MetaOperation) -> Result<Self, GraphError> {
        Ok(Self {
            version: PRESET_VERSION,
            operation: operation.descriptor().metadata.id.clone(),
            name: None,
            parameters: operation.parameter_values()?.clone(),
        })
    }

    /// Check the target operation and every stored entry before anything
    /// is written, so a rejected preset leaves its target untouched.
    fn check_against(&self, metadata: &NodeMetadata) -> Result<(), PresetError> {
        if self.operation != metadata.id {
            return Err(PresetError::WrongOperation {
                expected: metadata.id.clone(),
                found: self.operation.clone(),
            });
        }
        for (name, value) in &self.parameters {
            if metadata.get_parameter(name).is_none() {
                return Err(GraphError::UnknownParameter {
                    operation: metadata.id.clone(),
                    parameter: name.clone(),
                }
                .into());
            }
            if !value.is_finite() {
                return Err(GraphError::InvalidParameter {
                    parameter: name.clone(),
                    reason: format!("{} is not a finite number", value),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Write every stored value into an attached operation.
    pub fn apply(&self, operation: &mut MetaOperation) -> Result<(), PresetError> {
        self.check_against(&operation.descriptor().metadata)?;
        for (name, value) in &self.parameters {
            operation.set_parameter(name, *value)?;
        }
        Ok(())
    }

    /// Write every stored value into a graph node through the graph's
    /// parameter path, which clamps to the declared ranges.
    pub fn apply_to_node(&self, graph: &mut ProcessingGraph, node_id: NodeId) -> Result<(), PresetError> {
        let metadata = graph.get_node(node_id)?.filter.metadata();
        self.check_against(&metadata)?;
        for (name, value) in &self.parameters {
            graph.set_parameter(node_id, name, Value::Float(*value))?;
        }
        log::debug!("Applied {} preset values to node {}", self.parameters.len(), node_id);
        Ok(())
    }

    pub fn encode(&self, format: PresetFormat) -> Result<String, PresetError> {
        Ok(match format {
            PresetFormat::Json => serde_json::to_string_pretty(self)?,
            PresetFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    pub fn decode(text: &str, format: PresetFormat) -> Result<Self, PresetError> {
        Ok(match format {
            PresetFormat::Json => serde_json::from_str(text)?,
            PresetFormat::Toml => toml::from_str(text)?,
        })
    }

    /// Save to `path`; the extension selects JSON or TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PresetError> {
        let path = path.as_ref();
        let text = self.encode(PresetFormat::from_path(path)?)?;
        std::fs::write(path, text)?;
        log::info!("Wrote preset {}", path.display());
        Ok(())
    }

    /// Load from `path`; the extension selects JSON or TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let format = PresetFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        Self::decode(&text, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::meta::CommonAdjustments;
    use crate::core::node::FilterNode;
    use crate::filters::registry::FilterRegistry;

    fn attached() -> MetaOperation {
        let mut op = CommonAdjustments::operation();
        op.attach(&FilterRegistry::with_builtins()).unwrap();
        op
    }

    #[test]
    fn test_capture_and_apply() {
        let mut source = attached();
        source.set_parameter("contrast", 1.4).unwrap();
        source.set_parameter("it", 5200.0).unwrap();

        let preset = ParameterPreset::from_operation(&source).unwrap();
        assert_eq!(preset.parameters.len(), 9);
        assert_eq!(preset.parameters.keys().next().map(String::as_str), Some("scale"));

        let mut target = attached();
        preset.apply(&mut target).unwrap();
        assert_eq!(target.get_parameter("contrast").unwrap(), 1.4);
        assert_eq!(target.internal_parameter("it").unwrap(), Value::Float(5200.0));
    }

    #[test]
    fn test_save_load_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let preset = ParameterPreset::new(CommonAdjustments::ID)
            .with_name("warm")
            .with_value("ot", 5000.0)
            .with_value("scale", 1.2);

        for file in ["warm.json", "warm.toml"] {
            let path = dir.path().join(file);
            preset.save(&path).unwrap();
            assert_eq!(ParameterPreset::load(&path).unwrap(), preset, "{}", file);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let preset = ParameterPreset::new(CommonAdjustments::ID);
        let err = preset.save("preset.yaml").unwrap_err();
        assert!(matches!(err, PresetError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[test]
    fn test_wrong_operation_rejected() {
        let preset = ParameterPreset::new("metaops:other").with_value("scale", 2.0);
        let mut op = attached();

        assert!(matches!(
            preset.apply(&mut op),
            Err(PresetError::WrongOperation { .. })
        ));
        assert_eq!(op.get_parameter("scale").unwrap(), 1.0);
    }

    #[test]
    fn test_unknown_parameter_changes_nothing() {
        let preset = ParameterPreset::new(CommonAdjustments::ID)
            .with_value("contrast", 1.8)
            .with_value("gamma", 2.0)
            .with_value("chroma", 20.0);
        let mut op = attached();

        assert!(matches!(
            preset.apply(&mut op),
            Err(PresetError::Graph(GraphError::UnknownParameter { .. }))
        ));
        assert_eq!(op.get_parameter("contrast").unwrap(), 1.0);
        assert_eq!(op.internal_parameter("contrast").unwrap(), Value::Float(1.0));

        let mut graph = ProcessingGraph::new();
        let node = graph.add_filter(
            FilterRegistry::with_builtins()
                .instantiate(CommonAdjustments::ID)
                .unwrap(),
        );
        assert!(preset.apply_to_node(&mut graph, node).is_err());
        assert!(graph.get_node(node).unwrap().parameters().is_empty());
    }

    #[test]
    fn test_non_finite_value_changes_nothing() {
        let preset = ParameterPreset::new(CommonAdjustments::ID)
            .with_value("scale", 2.0)
            .with_value("it", f64::NAN);
        let mut op = attached();

        assert!(matches!(
            preset.apply(&mut op),
            Err(PresetError::Graph(GraphError::InvalidParameter { .. }))
        ));
        assert_eq!(op.get_parameter("scale").unwrap(), 1.0);
    }

    #[test]
    fn test_apply_to_node_clamps() {
        let mut graph = ProcessingGraph::new();
        let node = graph.add_filter(
            FilterRegistry::with_builtins()
                .instantiate(CommonAdjustments::ID)
                .unwrap(),
        );

        ParameterPreset::new(CommonAdjustments::ID)
            .with_value("brightness", 9.0)
            .apply_to_node(&mut graph, node)
            .unwrap();

        let stored = graph.get_node(node).unwrap().get_parameter("brightness");
        assert_eq!(stored, Some(Value::Float(3.0)));
    }
}
