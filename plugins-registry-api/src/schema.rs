//! Configuration schema validation
//!
//! Plugins describe their settings with a small JSON-schema-like document:
//!
//! ```json
//! {
//!   "required": ["apiKey"],
//!   "properties": {
//!     "apiKey":  { "type": "string", "minLength": 8, "pattern": "^sk-" },
//!     "timeout": { "type": "integer", "minimum": 1, "maximum": 300 },
//!     "debug":   { "type": "boolean" }
//!   }
//! }
//! ```
//!
//! Validation stops at the first violation. Submitted keys without a matching
//! property are accepted as-is.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{RegistryError, RegistryResult};

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    /// Declared but not checked
    Other(String),
    /// No `type` key
    Unspecified,
}

impl PropertyType {
    fn from_declared(declared: Option<&Value>) -> Self {
        match declared.and_then(Value::as_str) {
            Some("string") => Self::String,
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub kind: PropertyType,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl PropertySchema {
    fn from_value(value: &Map<String, Value>) -> Self {
        Self {
            kind: PropertyType::from_declared(value.get("type")),
            min_length: value
                .get("minLength")
                .and_then(Value::as_f64)
                .filter(|n| *n >= 0.0)
                .map(|n| n.floor() as u64),
            pattern: value
                .get("pattern")
                .and_then(Value::as_str)
                .map(str::to_string),
            minimum: value.get("minimum").and_then(Value::as_f64),
            maximum: value.get("maximum").and_then(Value::as_f64),
        }
    }

    fn check(&self, field: &str, value: &Value) -> RegistryResult<()> {
        match self.kind {
            PropertyType::String => {
                let Some(text) = value.as_str() else {
                    return Err(RegistryError::validation(
                        field,
                        format!("field '{field}' must be a string"),
                    ));
                };
                if let Some(min) = self.min_length {
                    if (text.chars().count() as u64) < min {
                        return Err(RegistryError::validation(
                            field,
                            format!("field '{field}' must be at least {min} characters"),
                        ));
                    }
                }
                if let Some(pattern) = &self.pattern {
                    let regex = Regex::new(pattern).map_err(|e| {
                        RegistryError::validation(
                            field,
                            format!("field '{field}' has an invalid pattern '{pattern}': {e}"),
                        )
                    })?;
                    if !regex.is_match(text) {
                        return Err(RegistryError::validation(
                            field,
                            format!("field '{field}' does not match required pattern '{pattern}'"),
                        ));
                    }
                }
                Ok(())
            }
            PropertyType::Integer | PropertyType::Number => {
                let Some(number) = value.as_f64() else {
                    return Err(RegistryError::validation(
                        field,
                        format!("field '{field}' must be a number"),
                    ));
                };
                if let Some(min) = self.minimum {
                    if number < min {
                        return Err(RegistryError::validation(
                            field,
                            format!("field '{field}' must be at least {min}"),
                        ));
                    }
                }
                if let Some(max) = self.maximum {
                    if number > max {
                        return Err(RegistryError::validation(
                            field,
                            format!("field '{field}' must be at most {max}"),
                        ));
                    }
                }
                Ok(())
            }
            PropertyType::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(RegistryError::validation(
                        field,
                        format!("field '{field}' must be a boolean"),
                    ))
                }
            }
            PropertyType::Other(_) | PropertyType::Unspecified => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSchema {
    pub required: Vec<String>,
    pub properties: BTreeMap<String, PropertySchema>,
}

impl ConfigSchema {
    /// Interpret a stored schema document
    ///
    /// Malformed `required` entries and non-object properties are skipped.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Schema`] when the document is not an object.
    pub fn from_value(document: &Value) -> RegistryResult<Self> {
        let Value::Object(root) = document else {
            return Err(RegistryError::Schema(
                "config schema must be a JSON object".to_string(),
            ));
        };

        let required = root
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let properties = root
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(name, prop)| {
                        prop.as_object()
                            .map(|p| (name.clone(), PropertySchema::from_value(p)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            required,
            properties,
        })
    }

    /// Check a submission; the first violation wins
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] naming the offending field.
    pub fn validate(&self, values: &Map<String, Value>) -> RegistryResult<()> {
        for field in &self.required {
            if is_missing(values.get(field)) {
                return Err(RegistryError::validation(
                    field.clone(),
                    format!("required field '{field}' is missing or empty"),
                ));
            }
        }

        for (field, value) in values {
            if let Some(property) = self.properties.get(field) {
                property.check(field, value)?;
            }
        }

        Ok(())
    }
}

/// Whether a stored schema document counts as "no schema"
pub fn is_absent(document: &Value) -> bool {
    match document {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
