//! Tool capability descriptions
//!
//! A [`ToolSpec`] names a tool, describes it for the planner prompt and lists
//! its parameters. [`ToolSpec::check`] is the single place where a parameter
//! map is validated against it.

use super::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    pub fn conforms(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }

    /// Converts `value` into this type when the intent is unambiguous
    ///
    /// Numeric strings become numbers, integral floats become integers and
    /// scalars become strings. Returns `None` when no such conversion exists.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        if self.conforms(&value) {
            return Some(value);
        }

        match (self, &value) {
            (ParamType::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().ok().map(Value::from)
            }
            (ParamType::Integer, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            (ParamType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),
            (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (ParamType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: false,
            description: description.to_string(),
        }
    }
}

/// Why a parameter map does not satisfy a [`ToolSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamViolation {
    Missing {
        param: String,
    },
    Invalid {
        param: String,
        expected: ParamType,
        found: String,
    },
}

impl fmt::Display for ParamViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamViolation::Missing { param } => {
                write!(f, "missing required parameter '{}'", param)
            }
            ParamViolation::Invalid {
                param,
                expected,
                found,
            } => write!(
                f,
                "parameter '{}' should be {} but was {}",
                param, expected, found
            ),
        }
    }
}

impl From<ParamViolation> for ToolError {
    fn from(violation: ParamViolation) -> Self {
        ToolError::invalid_parameters(violation.to_string())
    }
}

/// Parameters accepted by [`ToolSpec::check`]
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedParams {
    pub params: Map<String, Value>,
    /// Names that are not part of the spec and were left out
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// JSON-schema style description of the parameters, used in prompts
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }

        let required: Vec<&str> = self.required_params().map(|p| p.name.as_str()).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validates and normalizes a parameter map
    ///
    /// Required parameters must be present and neither null nor blank.
    /// Values are coerced to the declared type; unknown names are dropped,
    /// as are optional parameters set to null.
    pub fn check(&self, params: &Map<String, Value>) -> Result<CheckedParams, ParamViolation> {
        let mut accepted = Map::new();

        for spec in &self.params {
            let value = params.get(&spec.name).filter(|v| !is_blank(v)).cloned();

            let value = match value {
                Some(v) => v,
                None if spec.required => {
                    return Err(ParamViolation::Missing {
                        param: spec.name.clone(),
                    })
                }
                None => continue,
            };

            let found = value_kind(&value);
            let coerced =
                spec.param_type
                    .coerce(value)
                    .ok_or_else(|| ParamViolation::Invalid {
                        param: spec.name.clone(),
                        expected: spec.param_type,
                        found,
                    })?;
            accepted.insert(spec.name.clone(), coerced);
        }

        let dropped = params
            .keys()
            .filter(|k| self.param(k).is_none())
            .cloned()
            .collect();

        Ok(CheckedParams {
            params: accepted,
            dropped,
        })
    }
}

impl CheckedParams {
    pub fn str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_str())
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(|v| v.as_i64())
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(|v| v.as_f64())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn value_kind(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
