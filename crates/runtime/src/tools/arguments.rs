//! Validation of raw engine arguments against a declaration.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use super::{ArgumentError, ParamSpec, ParamType, ToolError};

/// Arguments that passed validation.
///
/// Every value has been coerced to its declared type and unknown names have
/// been rejected, so deserializing into the tool's argument record only fails
/// when the record disagrees with the declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Validate and coerce `raw` against `params`.
    ///
    /// Reports the first violation: missing required parameters (declaration
    /// order), then unexpected names, then type mismatches (declaration order).
    pub fn validate(params: &[ParamSpec], raw: &Value) -> Result<Self, ArgumentError> {
        let empty = Map::new();
        let provided = match raw {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ArgumentError::NotAnObject {
                    found: json_type_name(other).to_string(),
                });
            }
        };

        let present = |name: &str| provided.get(name).is_some_and(|v| !v.is_null());

        if let Some(missing) = params.iter().find(|p| p.required && !present(&p.name)) {
            return Err(ArgumentError::Missing {
                name: missing.name.clone(),
            });
        }

        if let Some(extra) = provided
            .keys()
            .find(|key| !params.iter().any(|p| &p.name == *key))
        {
            return Err(ArgumentError::Unexpected {
                name: extra.clone(),
            });
        }

        let mut validated = Map::new();
        for param in params {
            let Some(value) = provided.get(&param.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let coerced = param
                .ty
                .coerce(value)
                .ok_or_else(|| ArgumentError::TypeMismatch {
                    name: param.name.clone(),
                    expected: param.ty,
                    found: describe(value),
                })?;
            validated.insert(param.name.clone(), coerced);
        }

        Ok(Self(validated))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize into a typed argument record.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ToolError::InvalidInput(e.to_string()))
    }
}

impl ParamType {
    /// Convert `value` to this type, if it has an unambiguous reading.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Integer, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(Value::from),
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Number, Value::Number(_)) => Some(value.clone()),
            (Self::Number, Value::String(s)) => parse_number(s.trim()),
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::Boolean, Value::Bool(_)) => Some(value.clone()),
            (Self::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {s:?}"),
        Value::Number(n) => format!("number {n}"),
        Value::Bool(b) => format!("boolean {b}"),
        other => json_type_name(other).to_string(),
    }
}
