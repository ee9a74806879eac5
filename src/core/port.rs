//! Port and parameter declarations.
//!
//! Ports are the edges a node can be wired through. Parameters are values
//! set on the node itself; each declares a default, an optional valid range
//! and hints that only affect how a UI presents it (slider range, response
//! gamma, unit).

use crate::core::types::{PortType, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `std-dev` becomes `Std Dev`, `original_temperature` becomes
/// `Original Temperature`.
pub fn title_case(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if c == '-' || c == '_' {
            label.push(' ');
            upper = true;
        } else if upper {
            label.extend(c.to_uppercase());
            upper = false;
        } else {
            label.push(c);
        }
    }
    label
}

/// An input or output port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDefinition {
    pub name: String,
    pub port_type: PortType,
    /// Optional inputs may be left unconnected.
    pub optional: bool,
    pub description: String,
}

impl PortDefinition {
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
            optional: false,
            description: String::new(),
        }
    }

    /// Outputs are declared the same way as inputs; the metadata list they
    /// are added to decides the direction.
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::input(name, port_type)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// How a UI should present a parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum UiHint {
    #[default]
    Default,
    /// A slider whose position maps to the value through `gamma`
    /// (1.0 is linear).
    Slider { gamma: f64 },
    /// A file picker limited to the given glob patterns.
    FileChooser { filters: Vec<String> },
}

/// A rule a parameter value must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Constraint {
    /// Inclusive numeric bounds.
    Range { min: f64, max: f64 },
    /// Strings only.
    NotEmpty,
}

impl Constraint {
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (Constraint::Range { min, max }, value) => match value.as_float() {
                Some(v) if !(v >= *min && v <= *max) => {
                    Err(format!("{} is outside [{}, {}]", v, min, max))
                }
                _ => Ok(()),
            },
            (Constraint::NotEmpty, Value::String(s)) if s.is_empty() => {
                Err("must not be empty".to_string())
            }
            (Constraint::NotEmpty, _) => Ok(()),
        }
    }
}

/// A declared node parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub display_name: String,
    pub param_type: PortType,
    pub default_value: Value,
    pub description: String,
    pub constraints: Vec<Constraint>,
    pub ui_hint: UiHint,
    /// Slider sub-range; may be narrower than the valid range.
    pub ui_range: Option<(f64, f64)>,
    /// Free-form UI metadata, e.g. `unit = "kelvin"`.
    pub ui_meta: IndexMap<String, String>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, param_type: PortType, default_value: Value) -> Self {
        let name = name.into();
        Self {
            display_name: title_case(&name),
            name,
            param_type,
            default_value,
            description: String::new(),
            constraints: Vec::new(),
            ui_hint: UiHint::Default,
            ui_range: None,
            ui_meta: IndexMap::new(),
        }
    }

    pub fn float(name: impl Into<String>, default_value: f64) -> Self {
        Self::new(name, PortType::Float, Value::Float(default_value))
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare the inclusive valid range. A parameter with a range is shown
    /// as a linear slider unless another widget was chosen.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        if self.ui_hint == UiHint::Default {
            self.ui_hint = UiHint::Slider { gamma: 1.0 };
        }
        self
    }

    pub fn with_ui_range(mut self, min: f64, max: f64) -> Self {
        self.ui_range = Some((min, max));
        self
    }

    /// Presentation only; stored values are never transformed by it.
    pub fn with_ui_gamma(mut self, gamma: f64) -> Self {
        self.ui_hint = UiHint::Slider { gamma };
        self
    }

    pub fn with_ui_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ui_meta.insert(key.into(), value.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_ui_hint(mut self, ui_hint: UiHint) -> Self {
        self.ui_hint = ui_hint;
        self
    }

    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.constraints.iter().find_map(|c| match *c {
            Constraint::Range { min, max } => Some((min, max)),
            Constraint::NotEmpty => None,
        })
    }

    /// The UI range if declared, else the valid range.
    pub fn slider_range(&self) -> Option<(f64, f64)> {
        self.ui_range.or_else(|| self.value_range())
    }

    /// The slider gamma when it is not linear.
    pub fn ui_gamma(&self) -> Option<f64> {
        match self.ui_hint {
            UiHint::Slider { gamma } if gamma != 1.0 => Some(gamma),
            _ => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        self.ui_meta.get("unit").map(String::as_str)
    }

    /// Pull a numeric value into the valid range. Anything else passes
    /// through untouched.
    pub fn clamp(&self, value: Value) -> Value {
        let Some((min, max)) = self.value_range() else {
            return value;
        };
        match value {
            Value::Float(v) => Value::Float(v.clamp(min, max)),
            Value::Integer(v) if (v as f64) < min || (v as f64) > max => {
                Value::Integer((v as f64).clamp(min, max).round() as i64)
            }
            other => other,
        }
    }

    /// Check the type of `value`, then every constraint.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.param_type.matches(value) {
            return Err(format!(
                "'{}' expects a {} value, got {}",
                self.name,
                self.param_type,
                value.port_type()
            ));
        }
        self.constraints.iter().try_for_each(|c| c.check(value))
    }
}
